//! Typed access to view models from inside a bound subtree.

use std::sync::Arc;

use mvvm_core::{ViewModelKind, ViewModelLookup};
use mvvm_store::ViewModel;

use crate::error::LookupError;
use crate::scope::RenderScope;

/// Resolves a view model for a view rendering in `scope`.
///
/// With a store in scope, `lookup` is resolved through it. Without a key the
/// nearest active view model's id is used. Without a store only the active
/// view model can be returned, so a key must match it.
///
/// Unlike the store's own lookups, absence is an error here: a view asking for
/// a view model that does not exist is misconfigured.
///
/// # Examples
///
/// ```
/// use mvvm_binding::{LookupError, RenderScope, use_view_model};
/// use mvvm_store::{ViewModel, ViewModelCore, ViewModelStore};
///
/// #[derive(Debug)]
/// struct Menu {
///     core: ViewModelCore,
/// }
///
/// impl ViewModel for Menu {
///     fn core(&self) -> &ViewModelCore {
///         &self.core
///     }
/// }
///
/// let scope = RenderScope::with_store(ViewModelStore::new());
/// let err = use_view_model::<Menu>(&scope, None).unwrap_err();
/// assert_eq!(err, LookupError::MissingActiveContext);
///
/// let err = use_view_model::<Menu>(&scope, Some("menu".into())).unwrap_err();
/// assert!(err.is_not_found());
/// ```
pub fn use_view_model<VM: ViewModel>(
    scope: &RenderScope,
    lookup: Option<ViewModelLookup>,
) -> Result<Arc<VM>, LookupError> {
    let found = match (scope.store(), lookup) {
        (Some(store), Some(lookup)) => store
            .get_dyn(lookup.clone())
            .ok_or(LookupError::NotFound { lookup })?,
        (Some(store), None) => {
            let id = scope.active_id().ok_or(LookupError::MissingActiveContext)?;
            let lookup = ViewModelLookup::Id(id.clone());
            store
                .get_dyn(lookup.clone())
                .ok_or(LookupError::NotFound { lookup })?
        }
        (None, Some(lookup)) => scope
            .active_view_model()
            .filter(|active| matches_active(active, &lookup))
            .map(Arc::clone)
            .ok_or(LookupError::NotFound { lookup })?,
        (None, None) => scope
            .active_view_model()
            .map(Arc::clone)
            .ok_or(LookupError::MissingActiveContext)?,
    };

    downcast(found)
}

fn matches_active(active: &Arc<dyn ViewModel>, lookup: &ViewModelLookup) -> bool {
    match lookup {
        ViewModelLookup::Id(id) => active.id() == id,
        ViewModelLookup::Kind(kind) => active.kind() == *kind,
        // Component links live in the store.
        ViewModelLookup::Component(_) => false,
    }
}

fn downcast<VM: ViewModel>(found: Arc<dyn ViewModel>) -> Result<Arc<VM>, LookupError> {
    let id = found.id().clone();
    let kind = found.kind();
    found
        .into_any_arc()
        .downcast::<VM>()
        .map_err(|_| LookupError::TypeMismatch {
            id,
            expected: ViewModelKind::of::<VM>(),
            found: kind,
        })
}
