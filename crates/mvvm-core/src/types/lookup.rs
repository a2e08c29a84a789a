//! Lookup keys for resolving view models in a store.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::id::ViewModelId;
use super::kind::ViewModelKind;

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque identity for a bound component.
///
/// Every binding (and every wrapper around a binding) gets its own
/// component id. A store can link component ids to a view model kind so that
/// callers holding only the component reference can look up its view model.
///
/// # Examples
///
/// ```
/// use mvvm_core::ComponentId;
///
/// let first = ComponentId::next();
/// let second = ComponentId::next();
/// assert_ne!(first, second);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl ComponentId {
    /// Allocates a fresh, never reused component identity.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the inner u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// The key used to find a view model.
///
/// Kind and component lookups resolve to the most recently attached live
/// instance of that kind.
///
/// # Examples
///
/// ```
/// use mvvm_core::{ViewModelKind, ViewModelLookup};
///
/// struct Sidebar;
///
/// let by_id = ViewModelLookup::from("sidebar");
/// let by_kind = ViewModelLookup::kind::<Sidebar>();
///
/// assert!(by_id.as_id().is_some());
/// assert_eq!(by_kind, ViewModelLookup::Kind(ViewModelKind::of::<Sidebar>()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewModelLookup {
    /// A literal instance id.
    Id(ViewModelId),

    /// The concrete view model type.
    Kind(ViewModelKind),

    /// A component identity previously linked to a kind.
    Component(ComponentId),
}

impl ViewModelLookup {
    /// Creates a lookup by the view model type `T`.
    #[inline]
    #[must_use]
    pub fn kind<T: 'static>() -> Self {
        Self::Kind(ViewModelKind::of::<T>())
    }

    /// Returns the literal id if this is an id lookup.
    #[inline]
    #[must_use]
    pub const fn as_id(&self) -> Option<&ViewModelId> {
        match self {
            Self::Id(id) => Some(id),
            Self::Kind(_) | Self::Component(_) => None,
        }
    }
}

impl fmt::Display for ViewModelLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id \"{id}\""),
            Self::Kind(kind) => write!(f, "kind {}", kind.name()),
            Self::Component(component) => write!(f, "{component}"),
        }
    }
}

impl From<ViewModelId> for ViewModelLookup {
    fn from(id: ViewModelId) -> Self {
        Self::Id(id)
    }
}

impl From<&ViewModelId> for ViewModelLookup {
    fn from(id: &ViewModelId) -> Self {
        Self::Id(id.clone())
    }
}

impl From<&str> for ViewModelLookup {
    fn from(id: &str) -> Self {
        Self::Id(ViewModelId::from(id))
    }
}

impl From<String> for ViewModelLookup {
    fn from(id: String) -> Self {
        Self::Id(ViewModelId::from(id))
    }
}

impl From<ViewModelKind> for ViewModelLookup {
    fn from(kind: ViewModelKind) -> Self {
        Self::Kind(kind)
    }
}

impl From<ComponentId> for ViewModelLookup {
    fn from(component: ComponentId) -> Self {
        Self::Component(component)
    }
}
