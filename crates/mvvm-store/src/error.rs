//! Error types for the mvvm-store crate.

use mvvm_core::{LifecycleError, ViewModelId};

/// Errors returned by store operations.
///
/// Lookups never fail: absence is `None`/`false`. The only failures come from
/// view models reporting out-of-order lifecycle transitions, and only when the
/// store runs with [`LifecyclePolicy::Strict`](mvvm_core::LifecyclePolicy).
///
/// # Examples
///
/// ```
/// use mvvm_core::{LifecycleError, ViewModelId};
/// use mvvm_store::StoreError;
///
/// let err = StoreError::from(LifecycleError::Disposed { id: ViewModelId::new("card") });
/// assert!(err.is_use_after_dispose());
/// assert_eq!(err.id().as_str(), "card");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A view model rejected a mount or unmount.
    #[error("lifecycle violation: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl StoreError {
    /// Returns the id of the view model involved.
    #[must_use]
    pub const fn id(&self) -> &ViewModelId {
        match self {
            Self::Lifecycle(err) => err.id(),
        }
    }

    /// Returns `true` if a disposed view model was reused.
    #[inline]
    #[must_use]
    pub const fn is_use_after_dispose(&self) -> bool {
        match self {
            Self::Lifecycle(err) => err.is_use_after_dispose(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvvm_core::LifecycleState;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::from(LifecycleError::AlreadyMounted {
            id: ViewModelId::new("list"),
            state: LifecycleState::Mounted,
        });
        assert_eq!(
            err.to_string(),
            r#"lifecycle violation: view model "list" is already mounted"#
        );
        assert!(!err.is_use_after_dispose());
    }
}
