//! Store change notifications.

use std::fmt;

use mvvm_core::ViewModelId;
use serde::Serialize;

/// One logical store operation, published on the store's broadcast channel.
///
/// An attach that updates the count, the instance map and the kind index
/// emits a single [`Attached`](Self::Attached) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    /// The reference count of a view model went up.
    Attached {
        /// The view model id.
        id: ViewModelId,
        /// The count after the attach.
        attached: usize,
        /// Whether this attach made the view model live.
        first: bool,
    },

    /// A view model finished mounting.
    Mounted {
        /// The view model id.
        id: ViewModelId,
    },

    /// The reference count of a view model went down.
    Detached {
        /// The view model id.
        id: ViewModelId,
        /// The count after the detach.
        attached: usize,
    },

    /// A view model finished unmounting and left the store.
    Unmounted {
        /// The view model id.
        id: ViewModelId,
    },

    /// A view model rejected a lifecycle transition.
    LifecycleViolation {
        /// The view model id.
        id: ViewModelId,
        /// The rendered error.
        message: String,
    },

    /// The store was reset.
    Cleaned,
}

impl StoreEvent {
    /// Returns the id of the view model involved, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&ViewModelId> {
        match self {
            Self::Attached { id, .. }
            | Self::Mounted { id }
            | Self::Detached { id, .. }
            | Self::Unmounted { id }
            | Self::LifecycleViolation { id, .. } => Some(id),
            Self::Cleaned => None,
        }
    }
}

impl fmt::Display for StoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attached { id, attached, first } => {
                write!(f, "attach {id} (count {attached}")?;
                if *first {
                    f.write_str(", first")?;
                }
                f.write_str(")")
            }
            Self::Mounted { id } => write!(f, "mounted {id}"),
            Self::Detached { id, attached } => write!(f, "detach {id} (count {attached})"),
            Self::Unmounted { id } => write!(f, "unmounted {id}"),
            Self::LifecycleViolation { id, message } => write!(f, "violation {id}: {message}"),
            Self::Cleaned => f.write_str("cleaned"),
        }
    }
}
