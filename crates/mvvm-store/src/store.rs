//! The view model registry.
//!
//! [`ViewModelStore`] owns every live view model, keyed by id, and coordinates
//! their lifecycles through reference counting:
//!
//! - [`attach`](ViewModelStore::attach) increments the count; the 0→1 edge
//!   registers the instance and mounts it
//! - [`detach`](ViewModelStore::detach) decrements the count; the 1→0 edge
//!   unmounts the instance and removes it
//!
//! Count changes happen synchronously, before anything is awaited. Mounts and
//! unmounts of the same id are serialized through a per-id async lock, so an
//! unmount requested during an in-flight mount runs after it, and a re-attach
//! waits for the previous unmount. Each transition re-checks the registry once
//! it holds the lock and skips work that a later count change made obsolete.
//!
//! Registry locks are never held across an `.await`.

use std::fmt;
use std::sync::{Arc, Weak};

use mvvm_core::{
    ComponentId, Config, FxHashMap, IdGenerator, LifecycleError, LifecyclePolicy, StoreConfig,
    ViewModelId, ViewModelKind, ViewModelLookup,
};
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tokio::sync::{broadcast, Mutex as TransitionLock};
use tracing::{debug, warn};

use crate::create_config::{GenerateIdConfig, ViewModelCreateConfig};
use crate::error::StoreError;
use crate::events::StoreEvent;
use crate::snapshot::StoreSnapshot;
use crate::view_model::{FromCreateConfig, PayloadViewModel, ViewModel};

/// Ids of one kind in attach order. Most kinds have one or two live instances.
type KindIds = SmallVec<[ViewModelId; 2]>;

#[derive(Default)]
pub(crate) struct StoreState {
    pub(crate) instances: FxHashMap<ViewModelId, Arc<dyn ViewModel>>,
    pub(crate) attached_counts: FxHashMap<ViewModelId, usize>,
    pub(crate) ids_by_kind: FxHashMap<ViewModelKind, KindIds>,
    pub(crate) linked_components: FxHashMap<ComponentId, ViewModelKind>,

    /// Pending mounts per id.
    pub(crate) mounting: FxHashMap<ViewModelId, usize>,

    /// Pending unmounts per id.
    pub(crate) unmounting: FxHashMap<ViewModelId, usize>,
}

impl StoreState {
    fn count(&self, id: &ViewModelId) -> usize {
        self.attached_counts.get(id).copied().unwrap_or(0)
    }

    fn is_current(&self, vm: &Arc<dyn ViewModel>) -> bool {
        self.instances
            .get(vm.id())
            .is_some_and(|current| Arc::ptr_eq(current, vm))
    }

    fn index(&mut self, vm: &Arc<dyn ViewModel>) {
        let id = vm.id();
        let ids = self.ids_by_kind.entry(vm.kind()).or_default();
        ids.retain(|existing| existing != id);
        ids.push(id.clone());
    }

    fn remove(&mut self, vm: &Arc<dyn ViewModel>) {
        let id = vm.id();
        self.instances.remove(id);
        let kind = vm.kind();
        if let Some(ids) = self.ids_by_kind.get_mut(&kind) {
            ids.retain(|existing| existing != id);
            if ids.is_empty() {
                self.ids_by_kind.remove(&kind);
            }
        }
    }

    fn latest_of_kind(&self, kind: ViewModelKind, warn_on_ambiguous: bool) -> Option<ViewModelId> {
        let ids = self.ids_by_kind.get(&kind)?;
        if warn_on_ambiguous && ids.len() > 1 {
            warn!(
                kind = kind.name(),
                count = ids.len(),
                "Found more than one view model of this kind; using the last attached"
            );
        }
        ids.last().cloned()
    }

    fn resolve(&self, lookup: &ViewModelLookup, warn_on_ambiguous: bool) -> Option<ViewModelId> {
        match lookup {
            ViewModelLookup::Id(id) => self.instances.contains_key(id).then(|| id.clone()),
            ViewModelLookup::Kind(kind) => self.latest_of_kind(*kind, warn_on_ambiguous),
            ViewModelLookup::Component(component) => {
                let kind = *self.linked_components.get(component)?;
                self.latest_of_kind(kind, warn_on_ambiguous)
            }
        }
    }
}

fn add_pending(pending: &mut FxHashMap<ViewModelId, usize>, id: &ViewModelId) {
    *pending.entry(id.clone()).or_insert(0) += 1;
}

fn finish_pending(pending: &mut FxHashMap<ViewModelId, usize>, id: &ViewModelId) {
    if let Some(count) = pending.get_mut(id) {
        *count -= 1;
        if *count == 0 {
            pending.remove(id);
        }
    }
}

struct StoreInner {
    config: StoreConfig,
    ids: IdGenerator,
    state: RwLock<StoreState>,
    transitions: Mutex<FxHashMap<ViewModelId, Arc<TransitionLock<()>>>>,
    events: broadcast::Sender<StoreEvent>,
}

/// The registry of live view models.
///
/// Cheap to clone: clones share the same registry.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use mvvm_core::ViewModelLookup;
/// use mvvm_store::{ViewModel, ViewModelCore, ViewModelStore};
///
/// struct Toast {
///     core: ViewModelCore,
/// }
///
/// impl ViewModel for Toast {
///     fn core(&self) -> &ViewModelCore {
///         &self.core
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = ViewModelStore::new();
/// let toast = Arc::new(Toast { core: ViewModelCore::new::<Toast>("toast") });
///
/// store.attach(toast.clone()).await.unwrap();
/// assert!(toast.is_mounted());
/// assert!(store.get::<Toast>(ViewModelLookup::kind::<Toast>()).is_some());
///
/// store.detach(toast.id()).await.unwrap();
/// assert!(!store.has("toast"));
/// # });
/// ```
#[derive(Clone)]
pub struct ViewModelStore {
    inner: Arc<StoreInner>,
}

/// A non-owning handle to a [`ViewModelStore`].
///
/// View models resolve their parent through this handle so that a store and
/// its instances never keep each other alive.
#[derive(Clone, Default)]
pub struct WeakViewModelStore {
    inner: Weak<StoreInner>,
}

impl WeakViewModelStore {
    /// Returns the store if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<ViewModelStore> {
        self.inner.upgrade().map(|inner| ViewModelStore { inner })
    }
}

impl fmt::Debug for WeakViewModelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakViewModelStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Default for ViewModelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewModelStore {
    /// Creates a store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Creates a store from a full configuration.
    #[must_use]
    pub fn with_config(config: &Config) -> Self {
        Self::with_id_generator(config.store, IdGenerator::new(config.ids))
    }

    /// Creates a store with an explicit id generator.
    ///
    /// An `event_capacity` of zero is raised to one.
    #[must_use]
    pub fn with_id_generator(config: StoreConfig, ids: IdGenerator) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(StoreInner {
                config,
                ids,
                state: RwLock::new(StoreState::default()),
                transitions: Mutex::new(FxHashMap::default()),
                events,
            }),
        }
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Returns the store's id generator.
    #[must_use]
    pub fn id_generator(&self) -> &IdGenerator {
        &self.inner.ids
    }

    /// Returns a non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakViewModelStore {
        WeakViewModelStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns `true` if both handles share one registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Subscribes to store events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Resolves the id for a new instance.
    ///
    /// A non-empty fixed id is returned verbatim. Otherwise the next id of the
    /// config's scope is generated.
    pub fn generate_view_model_id(&self, config: &GenerateIdConfig) -> ViewModelId {
        self.inner
            .ids
            .resolve(config.id.as_ref(), &config.scope, Some(config.kind))
    }

    /// Links the config's component identities to its view model kind.
    ///
    /// Called by [`create_view_model`](Self::create_view_model) before
    /// construction, and by bindings that construct instances themselves.
    pub fn process_create_config<VM: PayloadViewModel>(&self, config: &ViewModelCreateConfig<VM>) {
        let components = config.component.into_iter().chain(config.external_component);
        self.link_components(config.kind, components);
    }

    /// Constructs a view model instance.
    ///
    /// Does not attach it. Logs a warning if the id is already live, since the
    /// new instance will not replace the registered one.
    pub fn create_view_model<VM: FromCreateConfig>(
        &self,
        mut config: ViewModelCreateConfig<VM>,
    ) -> Arc<VM> {
        self.process_create_config(&config);

        if self.has(&config.id) {
            warn!(
                id = %config.id,
                kind = config.kind.name(),
                "Creating a view model whose id is already live"
            );
        }

        if config.store.is_none() {
            config.store = Some(self.clone());
        }
        debug!(id = %config.id, kind = config.kind.name(), "Creating view model");
        Arc::new(VM::from_create_config(config))
    }

    // -------------------------------------------------------------------------
    // Reference counting
    // -------------------------------------------------------------------------

    /// Increments the reference count of `vm`'s id.
    ///
    /// The first attach registers the instance and mounts it. The view stays
    /// unrenderable until the mount resolves. Later attaches only count.
    pub async fn attach(&self, vm: Arc<dyn ViewModel>) -> Result<(), StoreError> {
        let id = vm.id().clone();
        let (attached, first) = {
            let mut state = self.inner.state.write();
            let count = state.attached_counts.entry(id.clone()).or_insert(0);
            *count += 1;
            let attached = *count;
            let first = attached == 1;
            if first {
                state.instances.insert(id.clone(), Arc::clone(&vm));
                state.index(&vm);
                add_pending(&mut state.mounting, &id);
            } else if !state.is_current(&vm) {
                debug!(id = %id, "Attach with a different instance; keeping the registered one");
            }
            (attached, first)
        };

        debug!(id = %id, attached, first, "Attached view model");
        self.emit(StoreEvent::Attached {
            id: id.clone(),
            attached,
            first,
        });

        if !first {
            return Ok(());
        }

        let lock = self.transition_lock(&id);
        let result = {
            let _transition = lock.lock().await;
            let still_wanted = {
                let state = self.inner.state.read();
                state.count(&id) > 0 && state.is_current(&vm)
            };
            if still_wanted && !vm.is_mounted() {
                vm.mount().await.map(|()| true)
            } else {
                Ok(false)
            }
        };
        self.release_transition_lock(&id, &lock);
        finish_pending(&mut self.inner.state.write().mounting, &id);

        match result {
            Ok(mounted) => {
                if mounted {
                    debug!(id = %id, "Mounted view model");
                    self.emit(StoreEvent::Mounted { id });
                }
                Ok(())
            }
            Err(err) => {
                let outcome = self.lifecycle_violation(err);
                if outcome.is_err() {
                    self.rollback_attach(&vm);
                }
                outcome
            }
        }
    }

    /// Undoes the count taken by an attach whose mount was rejected.
    fn rollback_attach(&self, vm: &Arc<dyn ViewModel>) {
        let id = vm.id().clone();
        let attached = {
            let mut state = self.inner.state.write();
            if !state.is_current(vm) {
                return;
            }
            let Some(count) = state.attached_counts.get_mut(&id) else {
                return;
            };
            *count -= 1;
            let attached = *count;
            if attached == 0 {
                state.attached_counts.remove(&id);
                state.remove(vm);
            }
            attached
        };

        debug!(id = %id, attached, "Rolled back rejected attach");
        self.emit(StoreEvent::Detached { id, attached });
    }

    /// Decrements the reference count of `id`.
    ///
    /// The last detach unmounts the instance and removes it once the unmount
    /// resolves. Detaching an id that is not attached does nothing.
    pub async fn detach(&self, id: &ViewModelId) -> Result<(), StoreError> {
        let (attached, vm) = {
            let mut state = self.inner.state.write();
            let Some(count) = state.attached_counts.get_mut(id) else {
                debug!(id = %id, "Detach of a view model that is not attached");
                return Ok(());
            };
            *count -= 1;
            let attached = *count;
            if attached > 0 {
                (attached, None)
            } else {
                state.attached_counts.remove(id);
                add_pending(&mut state.unmounting, id);
                (attached, state.instances.get(id).cloned())
            }
        };

        debug!(id = %id, attached, "Detached view model");
        self.emit(StoreEvent::Detached {
            id: id.clone(),
            attached,
        });

        let Some(vm) = vm else {
            return Ok(());
        };

        let lock = self.transition_lock(id);
        let result = {
            let _transition = lock.lock().await;
            let reattached = {
                let state = self.inner.state.read();
                state.count(id) > 0 && state.is_current(&vm)
            };
            if !reattached && vm.is_mounted() {
                vm.unmount().await
            } else {
                Ok(())
            }
        };
        self.release_transition_lock(id, &lock);

        let removed = {
            let mut state = self.inner.state.write();
            finish_pending(&mut state.unmounting, id);
            let removable = state.count(id) == 0 && state.is_current(&vm);
            if removable {
                state.remove(&vm);
            }
            removable
        };
        if removed {
            debug!(id = %id, "Unmounted view model");
            self.emit(StoreEvent::Unmounted { id: id.clone() });
        }

        result.or_else(|err| self.lifecycle_violation(err))
    }

    fn lifecycle_violation(&self, err: LifecycleError) -> Result<(), StoreError> {
        self.emit(StoreEvent::LifecycleViolation {
            id: err.id().clone(),
            message: err.to_string(),
        });
        match self.inner.config.lifecycle_policy {
            LifecyclePolicy::Strict => Err(err.into()),
            _ => {
                warn!(id = %err.id(), error = %err, "Ignoring lifecycle violation");
                Ok(())
            }
        }
    }

    fn transition_lock(&self, id: &ViewModelId) -> Arc<TransitionLock<()>> {
        let mut transitions = self.inner.transitions.lock();
        Arc::clone(transitions.entry(id.clone()).or_default())
    }

    /// Drops the per-id lock entry once no other transition holds it.
    fn release_transition_lock(&self, id: &ViewModelId, lock: &Arc<TransitionLock<()>>) {
        let mut transitions = self.inner.transitions.lock();
        let idle = transitions
            .get(id)
            .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(lock) == 2);
        if idle {
            transitions.remove(id);
        }
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is not an error.
        let _ = self.inner.events.send(event);
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Resolves a lookup to a live id.
    ///
    /// Kind and component lookups return the most recently attached instance.
    /// A literal id resolves only if it is live.
    pub fn get_id(&self, lookup: impl Into<ViewModelLookup>) -> Option<ViewModelId> {
        let lookup = lookup.into();
        self.inner
            .state
            .read()
            .resolve(&lookup, self.inner.config.warn_on_ambiguous)
    }

    /// Returns `true` if the lookup resolves to a live view model.
    pub fn has(&self, lookup: impl Into<ViewModelLookup>) -> bool {
        self.get_id(lookup).is_some()
    }

    /// Returns the live view model the lookup resolves to.
    pub fn get_dyn(&self, lookup: impl Into<ViewModelLookup>) -> Option<Arc<dyn ViewModel>> {
        let lookup = lookup.into();
        let state = self.inner.state.read();
        let id = state.resolve(&lookup, self.inner.config.warn_on_ambiguous)?;
        state.instances.get(&id).cloned()
    }

    /// Returns the live view model the lookup resolves to, as `VM`.
    ///
    /// Returns `None` if it is absent or of another type.
    pub fn get<VM: ViewModel>(&self, lookup: impl Into<ViewModelLookup>) -> Option<Arc<VM>> {
        self.get_dyn(lookup)?.into_any_arc().downcast::<VM>().ok()
    }

    /// Returns `true` if the view is registered and not mounting.
    ///
    /// An in-flight unmount does not block rendering.
    pub fn is_able_to_render_view(&self, id: &ViewModelId) -> bool {
        let state = self.inner.state.read();
        state.instances.contains_key(id) && !state.mounting.contains_key(id)
    }

    /// Sum of the reference counts of all view models.
    pub fn mounted_views_count(&self) -> usize {
        self.inner.state.read().attached_counts.values().sum()
    }

    /// The reference count of one view model.
    pub fn attached_count(&self, id: &ViewModelId) -> usize {
        self.inner.state.read().count(id)
    }

    // -------------------------------------------------------------------------
    // Component links
    // -------------------------------------------------------------------------

    /// Links component identities to a view model kind.
    ///
    /// The first link of a component wins. Many components may link to one
    /// kind.
    pub fn link_components(
        &self,
        kind: ViewModelKind,
        components: impl IntoIterator<Item = ComponentId>,
    ) {
        let mut state = self.inner.state.write();
        for component in components {
            state.linked_components.entry(component).or_insert(kind);
        }
    }

    /// Removes component links.
    pub fn unlink_components(&self, components: impl IntoIterator<Item = ComponentId>) {
        let mut state = self.inner.state.write();
        for component in components {
            state.linked_components.remove(&component);
        }
    }

    // -------------------------------------------------------------------------
    // Reset and inspection
    // -------------------------------------------------------------------------

    /// Clears the registry without running any lifecycle hooks.
    pub fn clean(&self) {
        *self.inner.state.write() = StoreState::default();
        self.inner.transitions.lock().clear();
        debug!("Cleaned view model store");
        self.emit(StoreEvent::Cleaned);
    }

    /// Captures the registry state.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::capture(&self.inner.state.read())
    }
}

impl fmt::Debug for ViewModelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("ViewModelStore")
            .field("instances", &state.instances.len())
            .field("mounted_views", &state.attached_counts.values().sum::<usize>())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mvvm_core::{ComponentId, IdConfig, IdScope, LifecycleState};
    use tokio::sync::Notify;

    use super::*;
    use crate::testing::{OtherViewModel, CallLog, DummyViewModel};
    use crate::view_model::{PayloadViewModel, ViewModelCore};

    fn strict() -> StoreConfig {
        StoreConfig {
            lifecycle_policy: LifecyclePolicy::Strict,
            ..StoreConfig::default()
        }
    }

    fn lenient() -> StoreConfig {
        StoreConfig {
            lifecycle_policy: LifecyclePolicy::Lenient,
            ..StoreConfig::default()
        }
    }

    fn store() -> ViewModelStore {
        let ids = IdConfig {
            include_kind_name: false,
            ..IdConfig::default()
        };
        ViewModelStore::with_id_generator(strict(), IdGenerator::with_session_prefix(ids, "t"))
    }

    #[tokio::test]
    async fn test_reference_counting() {
        let store = store();
        let vm = Arc::new(DummyViewModel::new("1"));
        let id = vm.id().clone();

        store.attach(vm.clone()).await.unwrap();
        store.attach(vm.clone()).await.unwrap();
        assert_eq!(store.attached_count(&id), 2);

        store.detach(&id).await.unwrap();
        assert!(vm.is_mounted());
        assert_eq!(store.attached_count(&id), 1);
        assert!(store.has(&id));

        store.detach(&id).await.unwrap();
        assert!(!vm.is_mounted());
        assert!(!store.has(&id));
        assert_eq!(vm.log.count("did_mount(mounted=true)"), 1);
        assert_eq!(vm.log.count("did_unmount"), 1);
    }

    #[tokio::test]
    async fn test_detach_unknown_id_is_noop() {
        let store = store();
        store.detach(&ViewModelId::new("ghost")).await.unwrap();
        assert_eq!(store.mounted_views_count(), 0);
    }

    #[tokio::test]
    async fn test_mount_gating() {
        let store = store();
        let gate = Arc::new(Notify::new());
        let vm = Arc::new(DummyViewModel::new("slow").with_mount_gate(Arc::clone(&gate)));
        let id = vm.id().clone();

        let task = tokio::spawn({
            let store = store.clone();
            let vm: Arc<dyn ViewModel> = vm.clone();
            async move { store.attach(vm).await }
        });
        tokio::task::yield_now().await;

        assert!(store.has(&id));
        assert!(vm.is_mounted());
        assert!(!store.is_able_to_render_view(&id));
        assert!(store.snapshot().instance("slow").unwrap().mounting);

        gate.notify_one();
        task.await.unwrap().unwrap();
        assert!(store.is_able_to_render_view(&id));
        assert_eq!(vm.core().state(), LifecycleState::Mounted);
    }

    #[tokio::test]
    async fn test_unmount_waits_for_inflight_mount() {
        let store = store();
        let gate = Arc::new(Notify::new());
        let vm = Arc::new(DummyViewModel::new("slow").with_mount_gate(Arc::clone(&gate)));
        let id = vm.id().clone();

        let attach = tokio::spawn({
            let store = store.clone();
            let vm: Arc<dyn ViewModel> = vm.clone();
            async move { store.attach(vm).await }
        });
        tokio::task::yield_now().await;

        let detach = tokio::spawn({
            let store = store.clone();
            let id = id.clone();
            async move { store.detach(&id).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(store.attached_count(&id), 0);
        assert!(vm.log.calls().iter().all(|c| c != "did_unmount"));

        gate.notify_one();
        attach.await.unwrap().unwrap();
        detach.await.unwrap().unwrap();

        assert_eq!(
            vm.log.calls(),
            vec![
                "did_mount(mounted=true)",
                "on_mount",
                "on_unmount(mounted=false)",
                "did_unmount"
            ]
        );
        assert!(!store.has(&id));
    }

    #[tokio::test]
    async fn test_unmounting_view_still_renders() {
        let store = store();
        let gate = Arc::new(Notify::new());
        let vm = Arc::new(DummyViewModel::new("1").with_unmount_gate(Arc::clone(&gate)));
        let id = vm.id().clone();
        store.attach(vm.clone()).await.unwrap();

        let detach = tokio::spawn({
            let store = store.clone();
            let id = id.clone();
            async move { store.detach(&id).await }
        });
        tokio::task::yield_now().await;

        assert!(!vm.is_mounted());
        assert!(store.has(&id));
        assert!(store.is_able_to_render_view(&id));
        assert!(store.snapshot().instance("1").unwrap().unmounting);

        gate.notify_one();
        detach.await.unwrap().unwrap();
        assert!(!store.has(&id));
        assert!(!store.is_able_to_render_view(&id));
    }

    #[tokio::test]
    async fn test_reattach_during_unmount_waits() {
        let store = store();
        let gate = Arc::new(Notify::new());
        let old = Arc::new(DummyViewModel::new("1").with_unmount_gate(Arc::clone(&gate)));
        store.attach(old.clone()).await.unwrap();

        let detach = tokio::spawn({
            let store = store.clone();
            async move { store.detach(&ViewModelId::new("1")).await }
        });
        tokio::task::yield_now().await;

        let fresh = Arc::new(DummyViewModel::new("1"));
        let attach = tokio::spawn({
            let store = store.clone();
            let vm: Arc<dyn ViewModel> = fresh.clone();
            async move { store.attach(vm).await }
        });
        tokio::task::yield_now().await;
        assert!(!fresh.is_mounted());

        gate.notify_one();
        detach.await.unwrap().unwrap();
        attach.await.unwrap().unwrap();

        assert!(old.core().is_disposed());
        assert!(fresh.is_mounted());
        let current = store.get::<DummyViewModel>("1").unwrap();
        assert!(Arc::ptr_eq(&current, &fresh));
        assert_eq!(store.attached_count(fresh.id()), 1);
    }

    #[tokio::test]
    async fn test_payload_idempotence_through_store() {
        let store = store();
        let vm = Arc::new(DummyViewModel::new("1"));
        store.attach(vm.clone()).await.unwrap();

        let stored = store.get::<DummyViewModel>("1").unwrap();
        stored.set_payload(CallLog::payload(1));
        stored.set_payload(CallLog::payload(1));
        stored.set_payload(CallLog::payload(2));

        assert_eq!(vm.log.payloads().len(), 2);
    }

    #[tokio::test]
    async fn test_parent_resolution_through_store() {
        let store = store();
        let child = store.create_view_model(
            ViewModelCreateConfig::<DummyViewModel>::new("child", CallLog::payload(0))
                .with_parent_id("parent"),
        );
        assert!(child.parent_view_model().is_none());

        store
            .attach(Arc::new(DummyViewModel::new("parent")))
            .await
            .unwrap();
        let parent = child.parent_view_model().unwrap();
        assert_eq!(parent.id().as_str(), "parent");

        store.detach(&ViewModelId::new("parent")).await.unwrap();
        assert!(child.parent_view_model().is_none());
    }

    #[tokio::test]
    async fn test_parent_resolution_does_not_attach() {
        let store = store();
        let child = DummyViewModel::new("child").with_core(
            ViewModelCore::new::<DummyViewModel>("child")
                .with_parent_id("parent")
                .with_store(&store),
        );
        assert!(child.parent_view_model().is_none());
        assert_eq!(store.mounted_views_count(), 0);
    }

    #[tokio::test]
    async fn test_kind_lookup_returns_latest() {
        let store = store();
        store.attach(Arc::new(DummyViewModel::new("a"))).await.unwrap();
        store.attach(Arc::new(DummyViewModel::new("b"))).await.unwrap();
        store.attach(Arc::new(OtherViewModel::new("c"))).await.unwrap();

        let latest = store.get::<DummyViewModel>(ViewModelLookup::kind::<DummyViewModel>());
        assert_eq!(latest.unwrap().id().as_str(), "b");

        store.detach(&ViewModelId::new("b")).await.unwrap();
        let latest = store.get_id(ViewModelLookup::kind::<DummyViewModel>());
        assert_eq!(latest.unwrap().as_str(), "a");
    }

    #[tokio::test]
    async fn test_get_with_wrong_type_is_none() {
        let store = store();
        store.attach(Arc::new(OtherViewModel::new("c"))).await.unwrap();

        assert!(store.get::<DummyViewModel>("c").is_none());
        assert!(store.get::<OtherViewModel>("c").is_some());
        assert!(store.get_dyn("c").is_some());
    }

    #[tokio::test]
    async fn test_lookup_of_absent_id() {
        let store = store();
        assert!(store.get_id("nope").is_none());
        assert!(!store.has("nope"));
        assert!(store.get_dyn(ViewModelLookup::kind::<DummyViewModel>()).is_none());
        assert!(!store.is_able_to_render_view(&ViewModelId::new("nope")));
    }

    #[tokio::test]
    async fn test_component_links() {
        let store = store();
        let component = ComponentId::next();
        let wrapper = ComponentId::next();

        store.link_components(ViewModelKind::of::<DummyViewModel>(), [component, wrapper]);
        store.link_components(ViewModelKind::of::<OtherViewModel>(), [component]);

        store.attach(Arc::new(DummyViewModel::new("p"))).await.unwrap();
        store.attach(Arc::new(OtherViewModel::new("o"))).await.unwrap();

        assert_eq!(store.get_id(component).unwrap().as_str(), "p");
        assert_eq!(store.get_id(wrapper).unwrap().as_str(), "p");

        store.unlink_components([component]);
        assert!(store.get_id(component).is_none());
        assert!(store.has(wrapper));
    }

    #[tokio::test]
    async fn test_create_view_model_links_components() {
        let store = store();
        let component = ComponentId::next();
        let mut config = ViewModelCreateConfig::<DummyViewModel>::new("x", CallLog::payload(3));
        config.component = Some(component);

        let vm = store.create_view_model(config);
        assert_eq!(vm.payload(), CallLog::payload(3));
        assert!(!store.has("x"));

        store.attach(vm).await.unwrap();
        assert_eq!(store.get_id(component).unwrap().as_str(), "x");
    }

    #[tokio::test]
    async fn test_clean_resets_without_hooks() {
        let store = store();
        let vm = Arc::new(DummyViewModel::new("1"));
        store.attach(vm.clone()).await.unwrap();
        store.link_components(ViewModelKind::of::<DummyViewModel>(), [ComponentId::next()]);

        store.clean();
        assert_eq!(store.mounted_views_count(), 0);
        assert!(!store.has("1"));
        assert!(store.snapshot().linked_components.is_empty());
        assert_eq!(vm.log.count("did_unmount"), 0);
        assert!(vm.is_mounted());
    }

    #[tokio::test]
    async fn test_mounted_views_count_sums_counts() {
        let store = store();
        let a = Arc::new(DummyViewModel::new("a"));
        store.attach(a.clone()).await.unwrap();
        store.attach(a.clone()).await.unwrap();
        store.attach(Arc::new(DummyViewModel::new("b"))).await.unwrap();

        assert_eq!(store.mounted_views_count(), 3);
        store.detach(a.id()).await.unwrap();
        assert_eq!(store.mounted_views_count(), 2);
    }

    #[tokio::test]
    async fn test_reattach_disposed_instance_strict() {
        let store = store();
        let vm = Arc::new(DummyViewModel::new("1"));
        store.attach(vm.clone()).await.unwrap();
        store.detach(vm.id()).await.unwrap();

        let err = store.attach(vm.clone()).await.unwrap_err();
        assert!(err.is_use_after_dispose());
        assert!(!vm.is_mounted());
        assert!(!store.has(vm.id()));
        assert_eq!(store.attached_count(vm.id()), 0);
        assert!(!store.is_able_to_render_view(vm.id()));
        assert!(store.get_id(ViewModelLookup::kind::<DummyViewModel>()).is_none());
    }

    #[tokio::test]
    async fn test_zero_event_capacity_is_raised() {
        let config = StoreConfig {
            event_capacity: 0,
            ..strict()
        };
        let store = ViewModelStore::with_id_generator(config, IdGenerator::default());
        let mut events = store.subscribe();

        store.attach(Arc::new(DummyViewModel::new("1"))).await.unwrap();
        // Capacity one keeps only the newest event.
        assert!(matches!(events.recv().await, Err(broadcast::error::RecvError::Lagged(1))));
        assert!(matches!(events.recv().await.unwrap(), StoreEvent::Mounted { .. }));
    }

    #[tokio::test]
    async fn test_reattach_disposed_instance_lenient() {
        let store = ViewModelStore::with_id_generator(lenient(), IdGenerator::default());
        let vm = Arc::new(DummyViewModel::new("1"));
        store.attach(vm.clone()).await.unwrap();
        store.detach(vm.id()).await.unwrap();

        let mut events = store.subscribe();
        store.attach(vm.clone()).await.unwrap();
        assert!(!vm.is_mounted());

        let _attached = events.recv().await.unwrap();
        let violation = events.recv().await.unwrap();
        assert!(matches!(violation, StoreEvent::LifecycleViolation { .. }));
    }

    #[tokio::test]
    async fn test_reattach_fresh_instance_after_detach() {
        let store = store();
        let first = Arc::new(DummyViewModel::new("1"));
        store.attach(first.clone()).await.unwrap();
        store.detach(first.id()).await.unwrap();

        let second = Arc::new(DummyViewModel::new("1"));
        store.attach(second.clone()).await.unwrap();
        assert!(second.is_mounted());
        assert!(first.core().is_disposed());
        let current = store.get::<DummyViewModel>("1").unwrap();
        assert!(Arc::ptr_eq(&current, &second));
    }

    #[tokio::test]
    async fn test_one_event_per_operation() {
        let store = store();
        let mut events = store.subscribe();
        let vm = Arc::new(DummyViewModel::new("1"));

        store.attach(vm.clone()).await.unwrap();
        store.attach(vm.clone()).await.unwrap();
        store.detach(vm.id()).await.unwrap();
        store.detach(vm.id()).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event.to_string());
        }
        assert_eq!(
            seen,
            vec![
                "attach 1 (count 1, first)",
                "mounted 1",
                "attach 1 (count 2)",
                "detach 1 (count 1)",
                "detach 1 (count 0)",
                "unmounted 1",
            ]
        );
    }

    #[test]
    fn test_generate_view_model_id() {
        let store = store();
        let scope = IdScope::new();
        let config = GenerateIdConfig::new::<DummyViewModel>(scope.clone());

        assert_eq!(store.generate_view_model_id(&config).as_str(), "t_00000");
        assert_eq!(store.generate_view_model_id(&config).as_str(), "t_00001");
        assert_eq!(
            store
                .generate_view_model_id(&config.clone().with_id("fixed"))
                .as_str(),
            "fixed"
        );
        assert_eq!(scope.issued(), 2);
    }

    #[test]
    fn test_weak_handle_does_not_keep_store_alive() {
        let store = store();
        let weak = store.downgrade();
        assert!(weak.upgrade().unwrap().ptr_eq(&store));
        drop(store);
        assert!(weak.upgrade().is_none());
    }
}
