//! Error types for the mvvm-core crate.
//!
//! - [`ConfigError`] for configuration loading and validation
//! - [`LifecycleError`] for out-of-order lifecycle transitions

use camino::Utf8PathBuf;

use crate::types::{LifecycleState, ViewModelId};

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use mvvm_core::ConfigError;
///
/// let error = ConfigError::invalid_option("ids.pad_width", "must be between 1 and 20");
/// assert!(error.to_string().contains("ids.pad_width"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// A lifecycle transition was requested in the wrong state.
///
/// These are programmer errors: a view model mounted twice, unmounted while
/// not mounted, or touched after disposal. The store decides whether to
/// propagate or log them based on its lifecycle policy.
///
/// # Examples
///
/// ```
/// use mvvm_core::{LifecycleError, ViewModelId};
///
/// let error = LifecycleError::Disposed { id: ViewModelId::new("card") };
/// assert!(error.to_string().contains("card"));
/// assert_eq!(error.id().as_str(), "card");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// `mount` was called while already mounting or mounted.
    #[error("view model \"{id}\" is already {state}")]
    AlreadyMounted {
        /// The view model id.
        id: ViewModelId,
        /// The state it was in.
        state: LifecycleState,
    },

    /// `unmount` was called on a view model that is not mounted.
    #[error("view model \"{id}\" cannot unmount while {state}")]
    NotMounted {
        /// The view model id.
        id: ViewModelId,
        /// The state it was in.
        state: LifecycleState,
    },

    /// A transition was requested after disposal.
    #[error("view model \"{id}\" is disposed and cannot be reused")]
    Disposed {
        /// The view model id.
        id: ViewModelId,
    },
}

impl LifecycleError {
    /// Returns the id of the view model involved.
    #[must_use]
    pub const fn id(&self) -> &ViewModelId {
        match self {
            Self::AlreadyMounted { id, .. } | Self::NotMounted { id, .. } | Self::Disposed { id } => {
                id
            }
        }
    }

    /// Returns `true` if this error is a use-after-dispose.
    #[inline]
    #[must_use]
    pub const fn is_use_after_dispose(&self) -> bool {
        matches!(self, Self::Disposed { .. })
    }
}
