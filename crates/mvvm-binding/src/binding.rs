//! The per-node binding adapter.
//!
//! A [`ViewModelBinding`] stands for one bound component type: it owns the
//! component identity, the id scope, the configuration and a cache of the
//! instances its nodes use. Each rendered node is a [`BoundView`], driven by
//! the host through four calls that mirror a UI framework's render cycle:
//!
//! ```text
//! render        every render: resolve id (first time), create or reuse, gate
//! sync_payload  after every render: forward a changed payload
//! did_mount     once, after the first render: attach to the store
//! unmount       once, on removal: detach and evict the cached instance
//! ```
//!
//! `did_mount` can also be split with [`BoundView::mount_effect`] so the host
//! drives the attach elsewhere. Unmounting or dropping the node cancels an
//! attach that has not started and waits for one that has.
//!
//! Nodes that resolve to the same id share one instance. The cache keeps a
//! node count per id so a shared instance survives while any node uses it.

use std::fmt;
use std::sync::Arc;

use mvvm_core::{ComponentId, FxHashMap, IdGenerator, IdScope, ViewModelId, ViewModelKind};
use mvvm_store::{
    Fallback, FromCreateConfig, GenerateIdConfig, PayloadViewModel, StoreError, ViewModel,
    ViewModelCreateConfig, ViewModelStore,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::error::BindingError;
use crate::scope::RenderScope;

/// Derives a payload from raw render props.
pub type GetPayload<P> = Arc<dyn Fn(&RenderProps<P>) -> P + Send + Sync>;

/// Builds an instance instead of [`ViewModelStore::create_view_model`].
pub type Factory<VM> = Arc<dyn Fn(ViewModelCreateConfig<VM>) -> Arc<VM> + Send + Sync>;

/// Runs on every render of a bound view.
pub type OnRender<P> = Arc<dyn Fn(&RenderProps<P>) + Send + Sync>;

/// The inputs of one render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderProps<P> {
    /// The payload passed by the parent view.
    pub payload: P,

    /// Everything else the parent view passed.
    pub props: serde_json::Map<String, serde_json::Value>,
}

impl<P> RenderProps<P> {
    /// Props carrying only a payload.
    #[must_use]
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            props: serde_json::Map::new(),
        }
    }

    /// Adds a raw prop.
    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }
}

/// Options for a [`ViewModelBinding`].
pub struct BindingConfig<VM: PayloadViewModel> {
    /// A fixed id. Every node of the binding then shares one instance.
    pub id: Option<ViewModelId>,

    /// Rendered while the view model is mounting.
    pub fallback: Option<Fallback>,

    /// An id scope shared with other bindings.
    ///
    /// Bindings get a scope of their own when unset.
    pub scope: Option<IdScope>,

    /// Derives the payload from render props. Defaults to `props.payload`.
    pub get_payload: Option<GetPayload<VM::Payload>>,

    /// Replaces the store's constructor.
    pub factory: Option<Factory<VM>>,

    /// Identity of a wrapper around this binding, linked alongside the
    /// binding's own identity.
    pub external_component: Option<ComponentId>,

    /// Called on every render with the render props.
    pub on_render: Option<OnRender<VM::Payload>>,
}

impl<VM: PayloadViewModel> Default for BindingConfig<VM> {
    fn default() -> Self {
        Self {
            id: None,
            fallback: None,
            scope: None,
            get_payload: None,
            factory: None,
            external_component: None,
            on_render: None,
        }
    }
}

impl<VM: PayloadViewModel> Clone for BindingConfig<VM> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            fallback: self.fallback.clone(),
            scope: self.scope.clone(),
            get_payload: self.get_payload.as_ref().map(Arc::clone),
            factory: self.factory.as_ref().map(Arc::clone),
            external_component: self.external_component,
            on_render: self.on_render.as_ref().map(Arc::clone),
        }
    }
}

impl<VM: PayloadViewModel> BindingConfig<VM> {
    /// An empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ViewModelId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the fallback.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<Arc<str>>) -> Self {
        self.fallback = Some(Fallback::new(fallback));
        self
    }

    /// Shares an id scope.
    #[must_use]
    pub fn with_scope(mut self, scope: IdScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Sets the payload accessor.
    #[must_use]
    pub fn with_get_payload(
        mut self,
        get_payload: impl Fn(&RenderProps<VM::Payload>) -> VM::Payload + Send + Sync + 'static,
    ) -> Self {
        self.get_payload = Some(Arc::new(get_payload));
        self
    }

    /// Sets the factory override.
    #[must_use]
    pub fn with_factory(
        mut self,
        factory: impl Fn(ViewModelCreateConfig<VM>) -> Arc<VM> + Send + Sync + 'static,
    ) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Sets the wrapper identity.
    #[must_use]
    pub const fn with_external_component(mut self, component: ComponentId) -> Self {
        self.external_component = Some(component);
        self
    }

    /// Sets the per-render callback.
    #[must_use]
    pub fn with_on_render(
        mut self,
        on_render: impl Fn(&RenderProps<VM::Payload>) + Send + Sync + 'static,
    ) -> Self {
        self.on_render = Some(Arc::new(on_render));
        self
    }
}

impl<VM: PayloadViewModel> fmt::Debug for BindingConfig<VM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingConfig")
            .field("id", &self.id)
            .field("fallback", &self.fallback)
            .field("get_payload", &self.get_payload.is_some())
            .field("factory", &self.factory.is_some())
            .field("external_component", &self.external_component)
            .field("on_render", &self.on_render.is_some())
            .finish_non_exhaustive()
    }
}

struct CachedInstance<VM> {
    view_model: Arc<VM>,
    nodes: usize,
}

struct BindingInner<VM: PayloadViewModel> {
    component: ComponentId,
    scope: IdScope,
    local_ids: IdGenerator,
    config: BindingConfig<VM>,
    instances: Mutex<FxHashMap<ViewModelId, CachedInstance<VM>>>,
}

/// A component type bound to view model type `VM`.
///
/// Cheap to clone: clones share identity, scope and instance cache.
pub struct ViewModelBinding<VM: PayloadViewModel> {
    inner: Arc<BindingInner<VM>>,
}

impl<VM: PayloadViewModel> Clone for ViewModelBinding<VM> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<VM: FromCreateConfig> ViewModelBinding<VM> {
    /// Creates a binding with a fresh component identity.
    #[must_use]
    pub fn new(config: BindingConfig<VM>) -> Self {
        let scope = config.scope.clone().unwrap_or_default();
        Self {
            inner: Arc::new(BindingInner {
                component: ComponentId::next(),
                scope,
                local_ids: IdGenerator::default(),
                config,
                instances: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    /// The binding's component identity.
    #[must_use]
    pub fn component(&self) -> ComponentId {
        self.inner.component
    }

    /// The id scope generated ids are drawn from.
    #[must_use]
    pub fn scope(&self) -> &IdScope {
        &self.inner.scope
    }

    /// The binding configuration.
    #[must_use]
    pub fn config(&self) -> &BindingConfig<VM> {
        &self.inner.config
    }

    /// Returns the cached instance for `id`.
    #[must_use]
    pub fn cached(&self, id: &ViewModelId) -> Option<Arc<VM>> {
        self.inner
            .instances
            .lock()
            .get(id)
            .map(|cached| Arc::clone(&cached.view_model))
    }

    /// Number of cached instances.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.inner.instances.lock().len()
    }

    /// Creates a node that has not rendered yet.
    #[must_use]
    pub fn node(&self) -> BoundView<VM> {
        BoundView {
            binding: self.clone(),
            id: None,
            view_model: None,
            store: None,
            rendered_payload: None,
            synced_payload: None,
            mount: None,
        }
    }

    fn resolve_id(&self, scope: &RenderScope) -> ViewModelId {
        let config = &self.inner.config;
        match scope.store() {
            Some(store) => store.generate_view_model_id(&GenerateIdConfig {
                id: config.id.clone(),
                kind: ViewModelKind::of::<VM>(),
                scope: self.inner.scope.clone(),
                parent_view_model_id: scope.active_id().cloned(),
                fallback: config.fallback.clone(),
            }),
            None => self.inner.local_ids.resolve(
                config.id.as_ref(),
                &self.inner.scope,
                Some(ViewModelKind::of::<VM>()),
            ),
        }
    }

    /// Takes a cache slot for `id`, creating the instance on a miss.
    fn acquire(&self, id: &ViewModelId, scope: &RenderScope, payload: &VM::Payload) -> Arc<VM> {
        let siblings = {
            let mut instances = self.inner.instances.lock();
            if let Some(cached) = instances.get_mut(id) {
                cached.nodes += 1;
                return Arc::clone(&cached.view_model);
            }
            instances
                .iter()
                .map(|(id, cached)| (id.clone(), Arc::clone(&cached.view_model)))
                .collect()
        };

        let created = self.create(id, scope, payload, siblings);

        let mut instances = self.inner.instances.lock();
        let cached = instances.entry(id.clone()).or_insert_with(|| CachedInstance {
            view_model: created,
            nodes: 0,
        });
        cached.nodes += 1;
        Arc::clone(&cached.view_model)
    }

    fn create(
        &self,
        id: &ViewModelId,
        scope: &RenderScope,
        payload: &VM::Payload,
        siblings: FxHashMap<ViewModelId, Arc<VM>>,
    ) -> Arc<VM> {
        let config = &self.inner.config;
        let store = scope.store();

        let mut create = ViewModelCreateConfig::<VM>::new(id.clone(), payload.clone());
        create.parent_view_model_id = scope.active_id().cloned();
        // Without a store the parent can only be the captured active view model.
        if store.is_none() {
            create.parent_view_model = scope.active_view_model().map(Arc::clone);
        }
        create.store = store.cloned();
        create.instances = siblings;
        create.fallback = config.fallback.clone();
        create.component = Some(self.inner.component);
        create.external_component = config.external_component;
        create.scope = self.inner.scope.clone();

        debug!(id = %id, kind = create.kind.name(), "Creating view model for bound view");
        match (&config.factory, store) {
            (Some(factory), Some(store)) => {
                store.process_create_config(&create);
                factory(create)
            }
            (Some(factory), None) => factory(create),
            (None, Some(store)) => store.create_view_model(create),
            (None, None) => Arc::new(VM::from_create_config(create)),
        }
    }

    /// Gives back a cache slot. The last node out evicts the instance.
    fn release(&self, id: &ViewModelId) {
        let mut instances = self.inner.instances.lock();
        if let Some(cached) = instances.get_mut(id) {
            cached.nodes -= 1;
            if cached.nodes == 0 {
                instances.remove(id);
            }
        }
    }
}

impl<VM: FromCreateConfig> fmt::Debug for ViewModelBinding<VM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModelBinding")
            .field("kind", &ViewModelKind::of::<VM>())
            .field("component", &self.inner.component)
            .field("config", &self.inner.config)
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}

/// The result of rendering a bound view.
pub enum RenderOutcome<VM> {
    /// The view model is ready; render the wrapped view with `scope`.
    Ready {
        /// The node's view model.
        view_model: Arc<VM>,
        /// The scope for the wrapped view and its descendants.
        scope: RenderScope,
    },

    /// The view model is mounting; render the fallback, or nothing.
    Fallback(Option<Fallback>),
}

impl<VM> RenderOutcome<VM> {
    /// Returns `true` for [`Ready`](Self::Ready).
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// The ready view model.
    #[must_use]
    pub const fn view_model(&self) -> Option<&Arc<VM>> {
        match self {
            Self::Ready { view_model, .. } => Some(view_model),
            Self::Fallback(_) => None,
        }
    }

    /// The child scope of a ready render.
    #[must_use]
    pub const fn scope(&self) -> Option<&RenderScope> {
        match self {
            Self::Ready { scope, .. } => Some(scope),
            Self::Fallback(_) => None,
        }
    }
}

impl<VM> fmt::Debug for RenderOutcome<VM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready { scope, .. } => f.debug_struct("Ready").field("scope", scope).finish_non_exhaustive(),
            Self::Fallback(fallback) => f.debug_tuple("Fallback").field(fallback).finish(),
        }
    }
}

/// Where a node's attach stands. Shared between the node and its effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MountState {
    /// Effect handed out, not started.
    Pending,
    /// Counted in the store; the node owes one detach.
    Attached,
    /// Rejected by the store; nothing to detach.
    Failed,
    /// Node removed; the effect must not attach.
    Released,
}

type SharedMountState = Arc<AsyncMutex<MountState>>;

/// Settles a node's attach on removal and detaches if it was counted.
async fn release_mount(
    mount: SharedMountState,
    store: Option<ViewModelStore>,
    id: ViewModelId,
) -> Result<(), StoreError> {
    // Waits for a running attach to finish.
    let previous = std::mem::replace(&mut *mount.lock().await, MountState::Released);
    match (previous, store) {
        (MountState::Attached, Some(store)) => store.detach(&id).await,
        _ => Ok(()),
    }
}

/// One rendered node of a [`ViewModelBinding`].
///
/// Call [`unmount`](Self::unmount) when the node is removed. A node dropped
/// without it gives back its cache slot and, inside a tokio runtime,
/// detaches in a spawned task.
pub struct BoundView<VM: FromCreateConfig> {
    binding: ViewModelBinding<VM>,
    id: Option<ViewModelId>,
    view_model: Option<Arc<VM>>,
    store: Option<ViewModelStore>,
    rendered_payload: Option<VM::Payload>,
    synced_payload: Option<VM::Payload>,
    mount: Option<SharedMountState>,
}

impl<VM: FromCreateConfig> BoundView<VM> {
    /// The node's id, fixed by the first render.
    #[must_use]
    pub const fn id(&self) -> Option<&ViewModelId> {
        self.id.as_ref()
    }

    /// The node's view model, available after the first render.
    #[must_use]
    pub const fn view_model(&self) -> Option<&Arc<VM>> {
        self.view_model.as_ref()
    }

    /// Returns `true` once the node's mount effect was handed out.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.mount.is_some()
    }

    /// Renders the node.
    ///
    /// The first render resolves the id and creates or reuses the instance.
    /// Later renders only derive the payload and re-check gating.
    pub fn render(&mut self, scope: &RenderScope, props: &RenderProps<VM::Payload>) -> RenderOutcome<VM> {
        let config = self.binding.config();
        let payload = config
            .get_payload
            .as_ref()
            .map_or_else(|| props.payload.clone(), |get_payload| get_payload(props));

        let id = match &self.id {
            Some(id) => id.clone(),
            None => {
                let id = self.binding.resolve_id(scope);
                self.store = scope.store().cloned();
                self.id = Some(id.clone());
                id
            }
        };

        let view_model = match &self.view_model {
            Some(view_model) => Arc::clone(view_model),
            None => {
                let view_model = self.binding.acquire(&id, scope, &payload);
                self.view_model = Some(Arc::clone(&view_model));
                view_model
            }
        };

        self.rendered_payload = Some(payload);

        if let Some(on_render) = &config.on_render {
            on_render(props);
        }

        let able = self
            .store
            .as_ref()
            .is_none_or(|store| store.is_able_to_render_view(&id));
        if !able {
            return RenderOutcome::Fallback(config.fallback.clone());
        }

        let active: Arc<dyn ViewModel> = Arc::clone(&view_model) as Arc<dyn ViewModel>;
        RenderOutcome::Ready {
            scope: scope.child_with_active(active),
            view_model,
        }
    }

    /// Forwards the payload of the last render if it changed since the last
    /// sync. Returns whether the view model's payload changed.
    pub fn sync_payload(&mut self) -> bool {
        let (Some(view_model), Some(payload)) = (&self.view_model, &self.rendered_payload) else {
            return false;
        };
        if self.synced_payload.as_ref() == Some(payload) {
            return false;
        }

        let payload = payload.clone();
        let changed = view_model.set_payload(payload.clone());
        self.synced_payload = Some(payload);
        changed
    }

    /// Attaches the node's view model to the store. Runs once.
    ///
    /// Without a store there is nothing to attach to and the view model is
    /// never mounted.
    pub async fn did_mount(&mut self) -> Result<(), BindingError> {
        if let Some(effect) = self.mount_effect()? {
            effect.await?;
        }
        Ok(())
    }

    /// Marks the node attached and returns the attach work without running
    /// it, so a caller can keep rendering the node while it mounts.
    ///
    /// The effect does nothing if the node is unmounted before it starts.
    /// Returns `None` when the node is already attached.
    pub fn mount_effect(
        &mut self,
    ) -> Result<Option<impl Future<Output = Result<(), BindingError>> + Send + 'static + use<VM>>, BindingError> {
        if self.mount.is_some() {
            return Ok(None);
        }
        let view_model = self.view_model.as_ref().ok_or(BindingError::NotRendered)?;
        let view_model: Arc<dyn ViewModel> = Arc::clone(view_model) as Arc<dyn ViewModel>;
        let store = self.store.clone();
        let mount = Arc::new(AsyncMutex::new(MountState::Pending));
        self.mount = Some(Arc::clone(&mount));

        Ok(Some(async move {
            // Held until the attach resolves so a removal waits for it.
            let mut state = mount.lock().await;
            if *state == MountState::Released {
                debug!(id = %view_model.id(), "Node removed before its mount started");
                return Ok(());
            }
            let result = match store {
                Some(store) => store.attach(view_model).await,
                None => Ok(()),
            };
            *state = if result.is_ok() {
                MountState::Attached
            } else {
                MountState::Failed
            };
            result.map_err(BindingError::from)
        }))
    }

    /// Detaches from the store and gives back the cache slot.
    ///
    /// Waits for a mount effect that is still running.
    pub async fn unmount(mut self) -> Result<(), BindingError> {
        let Some(id) = self.id.clone() else {
            return Ok(());
        };
        if self.view_model.take().is_some() {
            self.binding.release(&id);
        }

        if let Some(mount) = self.mount.take() {
            release_mount(mount, self.store.clone(), id).await?;
        }
        Ok(())
    }
}

impl<VM: FromCreateConfig> Drop for BoundView<VM> {
    fn drop(&mut self) {
        let Some(id) = self.id.clone() else {
            return;
        };
        if self.view_model.take().is_some() {
            self.binding.release(&id);
        }

        let Some(mount) = self.mount.take() else {
            return;
        };
        let Some(store) = self.store.clone() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                debug!(id = %id, "Bound view dropped while attached; detaching in the background");
                handle.spawn(async move {
                    if let Err(err) = release_mount(mount, Some(store), id.clone()).await {
                        warn!(id = %id, error = %err, "Background detach of a dropped view failed");
                    }
                });
            }
            Err(_) => {
                warn!(id = %id, "Bound view dropped outside a runtime; it stays attached");
            }
        }
    }
}

impl<VM: FromCreateConfig> fmt::Debug for BoundView<VM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundView")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}
