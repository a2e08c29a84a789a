//! Explicit render context.
//!
//! A [`RenderScope`] carries what a UI framework would otherwise pass through
//! ambient context: the store in scope and the nearest active view model.
//! Bound views receive one on render and hand a child scope, with themselves
//! as the active view model, to their descendants.

use std::fmt;
use std::sync::Arc;

use mvvm_core::ViewModelId;
use mvvm_store::{ViewModel, ViewModelStore};

/// The context a view renders in.
///
/// # Examples
///
/// ```
/// use mvvm_binding::RenderScope;
/// use mvvm_store::ViewModelStore;
///
/// let root = RenderScope::with_store(ViewModelStore::new());
/// assert!(root.store().is_some());
/// assert!(root.active_id().is_none());
/// ```
#[derive(Clone, Default)]
pub struct RenderScope {
    store: Option<ViewModelStore>,
    active: Option<Arc<dyn ViewModel>>,
}

impl RenderScope {
    /// A root scope with no store.
    ///
    /// Views bound under it always render and are never mounted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A root scope backed by `store`.
    #[must_use]
    pub fn with_store(store: ViewModelStore) -> Self {
        Self {
            store: Some(store),
            active: None,
        }
    }

    /// The store in scope.
    #[must_use]
    pub const fn store(&self) -> Option<&ViewModelStore> {
        self.store.as_ref()
    }

    /// The id of the nearest active view model.
    #[must_use]
    pub fn active_id(&self) -> Option<&ViewModelId> {
        self.active.as_ref().map(|vm| vm.id())
    }

    /// The nearest active view model.
    #[must_use]
    pub const fn active_view_model(&self) -> Option<&Arc<dyn ViewModel>> {
        self.active.as_ref()
    }

    /// Returns a scope for descendants of `view_model`.
    #[must_use]
    pub fn child_with_active(&self, view_model: Arc<dyn ViewModel>) -> Self {
        Self {
            store: self.store.clone(),
            active: Some(view_model),
        }
    }
}

impl fmt::Debug for RenderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderScope")
            .field("store", &self.store.is_some())
            .field("active", &self.active_id())
            .finish()
    }
}
