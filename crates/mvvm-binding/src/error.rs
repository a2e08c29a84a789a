//! Error types for the mvvm-binding crate.

use mvvm_core::{ViewModelId, ViewModelKind, ViewModelLookup};
use mvvm_store::StoreError;

/// Errors from the binding adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// The store rejected an attach or detach.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// `did_mount` ran before the first render resolved an instance.
    #[error("view must render before it mounts")]
    NotRendered,
}

/// Errors from [`use_view_model`](crate::use_view_model).
///
/// # Examples
///
/// ```
/// use mvvm_binding::LookupError;
/// use mvvm_core::ViewModelLookup;
///
/// let err = LookupError::NotFound { lookup: ViewModelLookup::from("sidebar") };
/// assert_eq!(err.to_string(), r#"no view model found for id "sidebar""#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Nothing live matches the key.
    #[error("no view model found for {lookup}")]
    NotFound {
        /// The key that was looked up.
        lookup: ViewModelLookup,
    },

    /// No key was given and no view model is active in the scope.
    #[error("no active view model in scope (lookup without a key used outside a bound view)")]
    MissingActiveContext,

    /// The view model exists but has another type.
    #[error("view model \"{id}\" is a {found}, not a {expected}")]
    TypeMismatch {
        /// The view model id.
        id: ViewModelId,
        /// The requested type.
        expected: ViewModelKind,
        /// The actual type.
        found: ViewModelKind,
    },
}

impl LookupError {
    /// Returns `true` for a missing view model.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
