//! Configuration passed to id generation and view model construction.

use std::fmt;
use std::sync::Arc;

use mvvm_core::{ComponentId, FxHashMap, IdScope, ViewModelId, ViewModelKind};

use crate::store::ViewModelStore;
use crate::view_model::{PayloadViewModel, ViewModel};

/// Content a bound view renders while its view model is not ready.
///
/// The binding layer never renders anything itself, so a fallback is just a
/// descriptor handed back to the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fallback(Arc<str>);

impl Fallback {
    /// Creates a fallback descriptor.
    #[must_use]
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self(label.into())
    }

    /// Returns the descriptor label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input for [`ViewModelStore::generate_view_model_id`].
#[derive(Debug, Clone)]
pub struct GenerateIdConfig {
    /// A fixed id. Returned verbatim when present and non-empty.
    pub id: Option<ViewModelId>,

    /// The view model type the id is for.
    pub kind: ViewModelKind,

    /// Memoization scope for the generated sequence.
    pub scope: IdScope,

    /// Id of the nearest active view model, if any.
    pub parent_view_model_id: Option<ViewModelId>,

    /// The fallback configured for the view.
    pub fallback: Option<Fallback>,
}

impl GenerateIdConfig {
    /// Creates a config for `VM` in `scope` with no fixed id.
    #[must_use]
    pub fn new<VM: 'static>(scope: IdScope) -> Self {
        Self {
            id: None,
            kind: ViewModelKind::of::<VM>(),
            scope,
            parent_view_model_id: None,
            fallback: None,
        }
    }

    /// Sets a fixed id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ViewModelId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Everything needed to construct a view model instance.
///
/// Passed to [`FromCreateConfig`](crate::FromCreateConfig) implementations by
/// the store, or to a factory override supplied by the binding.
pub struct ViewModelCreateConfig<VM: PayloadViewModel> {
    /// The resolved instance id.
    pub id: ViewModelId,

    /// The type being constructed.
    pub kind: ViewModelKind,

    /// Initial payload.
    pub payload: VM::Payload,

    /// Id of the parent view model (the nearest active one when rendered).
    pub parent_view_model_id: Option<ViewModelId>,

    /// A parent reference captured at construction time.
    ///
    /// When set, the parent is resolved from this reference instead of a
    /// store lookup.
    pub parent_view_model: Option<Arc<dyn ViewModel>>,

    /// The store the instance will be attached to, if any.
    pub store: Option<ViewModelStore>,

    /// Instances already cached by the same binding, keyed by id.
    pub instances: FxHashMap<ViewModelId, Arc<VM>>,

    /// The fallback configured for the view.
    pub fallback: Option<Fallback>,

    /// Identity of the binding creating the instance.
    pub component: Option<ComponentId>,

    /// Identity of a wrapper around that binding.
    pub external_component: Option<ComponentId>,

    /// The binding's id scope.
    pub scope: IdScope,
}

impl<VM: PayloadViewModel> ViewModelCreateConfig<VM> {
    /// Creates a minimal config with no parent, store or component links.
    #[must_use]
    pub fn new(id: impl Into<ViewModelId>, payload: VM::Payload) -> Self {
        Self {
            id: id.into(),
            kind: ViewModelKind::of::<VM>(),
            payload,
            parent_view_model_id: None,
            parent_view_model: None,
            store: None,
            instances: FxHashMap::default(),
            fallback: None,
            component: None,
            external_component: None,
            scope: IdScope::new(),
        }
    }

    /// Sets the parent view model id.
    #[must_use]
    pub fn with_parent_id(mut self, parent: impl Into<ViewModelId>) -> Self {
        self.parent_view_model_id = Some(parent.into());
        self
    }

    /// Sets the store handle used for parent resolution.
    #[must_use]
    pub fn with_store(mut self, store: &ViewModelStore) -> Self {
        self.store = Some(store.clone());
        self
    }
}

impl<VM: PayloadViewModel> fmt::Debug for ViewModelCreateConfig<VM>
where
    VM::Payload: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModelCreateConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("payload", &self.payload)
            .field("parent_view_model_id", &self.parent_view_model_id)
            .field("has_store", &self.store.is_some())
            .field("cached_instances", &self.instances.len())
            .field("fallback", &self.fallback)
            .field("component", &self.component)
            .field("external_component", &self.external_component)
            .finish_non_exhaustive()
    }
}
