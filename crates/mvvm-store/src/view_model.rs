//! The view model base: lifecycle, payload and parent resolution.
//!
//! A view model is a user type that embeds a [`ViewModelCore`] and implements
//! [`ViewModel`] (the object-safe part the store works with) plus
//! [`PayloadViewModel`] (the typed payload part the binding works with).
//!
//! # Lifecycle
//!
//! [`ViewModel::mount`] and [`ViewModel::unmount`] run a fixed protocol and
//! call the overridable hooks in a fixed order:
//!
//! ```text
//! mount:   flag on (Mounting) → did_mount() → on_mount().await → Mounted
//! unmount: flag off (Unmounting) → on_unmount().await → did_unmount() → dispose
//! ```
//!
//! The mounted flag flips before any asynchronous work. Override the hooks,
//! not `mount`/`unmount` themselves.
//!
//! # Example
//!
//! ```
//! use mvvm_store::{
//!     FromCreateConfig, PayloadCell, PayloadViewModel, ViewModel, ViewModelCore,
//!     ViewModelCreateConfig,
//! };
//!
//! struct Counter {
//!     core: ViewModelCore,
//!     payload: PayloadCell<u32>,
//! }
//!
//! impl ViewModel for Counter {
//!     fn core(&self) -> &ViewModelCore {
//!         &self.core
//!     }
//! }
//!
//! impl PayloadViewModel for Counter {
//!     type Payload = u32;
//!
//!     fn payload_cell(&self) -> &PayloadCell<u32> {
//!         &self.payload
//!     }
//! }
//!
//! impl FromCreateConfig for Counter {
//!     fn from_create_config(config: ViewModelCreateConfig<Self>) -> Self {
//!         Self {
//!             core: ViewModelCore::from_config(&config),
//!             payload: PayloadCell::new(config.payload),
//!         }
//!     }
//! }
//!
//! let counter = Counter::from_create_config(ViewModelCreateConfig::new("counter", 1));
//! assert!(counter.set_payload(2));
//! assert!(!counter.set_payload(2));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture};
use mvvm_core::{LifecycleError, LifecycleState, ViewModelId, ViewModelKind, ViewModelLookup};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::create_config::ViewModelCreateConfig;
use crate::payload::PayloadCell;
use crate::store::{ViewModelStore, WeakViewModelStore};

/// Conversion to `Any` for downcasting shared view models.
///
/// Implemented for every `Send + Sync + 'static` type.
pub trait AsAny: Any + Send + Sync {
    /// Converts a shared pointer into a shared `Any` pointer.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// The object-safe part of a view model.
///
/// Only [`core`](Self::core) is required. The lifecycle hooks have no-op
/// defaults.
pub trait ViewModel: AsAny {
    /// Returns the embedded core state.
    fn core(&self) -> &ViewModelCore;

    /// The instance id.
    fn id(&self) -> &ViewModelId {
        self.core().id()
    }

    /// The concrete view model type.
    fn kind(&self) -> ViewModelKind {
        self.core().kind()
    }

    /// Returns `true` between the mount flip and the start of unmount.
    fn is_mounted(&self) -> bool {
        self.core().is_mounted()
    }

    /// The id of the parent view model, if any.
    fn parent_view_model_id(&self) -> Option<&ViewModelId> {
        self.core().parent_view_model_id()
    }

    /// Resolves the parent view model.
    ///
    /// A pure lookup: it never creates or attaches anything. Returns `None`
    /// when there is no parent id or the parent is not live.
    fn parent_view_model(&self) -> Option<Arc<dyn ViewModel>> {
        self.core().resolve_parent()
    }

    /// Runs the mount protocol. Called by the store once per 0→1 attach.
    fn mount(&self) -> BoxFuture<'_, Result<(), LifecycleError>> {
        Box::pin(async move {
            self.core().begin_mount()?;
            self.did_mount();
            self.on_mount().await;
            self.core().finish_mount();
            Ok(())
        })
    }

    /// Runs synchronously right after the mounted flag flips on.
    fn did_mount(&self) {}

    /// Asynchronous setup. The store keeps the view unrenderable until this
    /// resolves.
    fn on_mount(&self) -> BoxFuture<'_, ()> {
        Box::pin(future::ready(()))
    }

    /// Runs the unmount protocol. Called by the store once per 1→0 detach.
    fn unmount(&self) -> BoxFuture<'_, Result<(), LifecycleError>> {
        Box::pin(async move {
            self.core().begin_unmount()?;
            self.on_unmount().await;
            self.did_unmount();
            self.core().dispose();
            Ok(())
        })
    }

    /// Asynchronous teardown, run after the mounted flag flips off.
    fn on_unmount(&self) -> BoxFuture<'_, ()> {
        Box::pin(future::ready(()))
    }

    /// Runs after teardown, right before the core is disposed.
    fn did_unmount(&self) {}
}

impl fmt::Debug for dyn ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("id", self.id())
            .field("kind", &self.kind())
            .field("state", &self.core().state())
            .finish()
    }
}

/// The typed payload part of a view model.
pub trait PayloadViewModel: ViewModel + Sized {
    /// Data supplied by the rendering view on every render.
    type Payload: Clone + PartialEq + Send + Sync + 'static;

    /// Returns the payload storage.
    fn payload_cell(&self) -> &PayloadCell<Self::Payload>;

    /// Returns a clone of the current payload.
    fn payload(&self) -> Self::Payload {
        self.payload_cell().get()
    }

    /// Replaces the payload if it is structurally different.
    ///
    /// Calls [`payload_changed`](Self::payload_changed) only when the value
    /// changed. Returns whether it did.
    fn set_payload(&self, payload: Self::Payload) -> bool {
        let changed = self.payload_cell().replace_if_changed(payload.clone());
        if changed {
            self.payload_changed(&payload);
        }
        changed
    }

    /// Called after the payload changed.
    fn payload_changed(&self, _payload: &Self::Payload) {}

    /// Subscribes to payload changes.
    fn watch_payload(&self) -> watch::Receiver<Self::Payload> {
        self.payload_cell().subscribe()
    }
}

/// Default construction used by [`ViewModelStore::create_view_model`].
pub trait FromCreateConfig: PayloadViewModel {
    /// Builds an instance from the store's create config.
    fn from_create_config(config: ViewModelCreateConfig<Self>) -> Self;
}

/// How a view model finds its parent.
#[derive(Clone, Default)]
pub enum ParentResolver {
    /// No parent.
    #[default]
    Detached,

    /// Look the parent id up in the store on every access.
    Store(WeakViewModelStore),

    /// A parent reference captured at construction time.
    Captured(Arc<dyn ViewModel>),
}

impl fmt::Debug for ParentResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => f.write_str("Detached"),
            Self::Store(_) => f.write_str("Store"),
            Self::Captured(parent) => f.debug_tuple("Captured").field(parent.id()).finish(),
        }
    }
}

type Cleanup = Box<dyn FnOnce() + Send>;

/// State every view model embeds.
///
/// Owns the id, the lifecycle state machine, parent resolution and the
/// resources released on disposal.
pub struct ViewModelCore {
    id: ViewModelId,
    kind: ViewModelKind,
    parent_id: Option<ViewModelId>,
    parent: ParentResolver,
    lifecycle: watch::Sender<LifecycleState>,
    cleanups: Mutex<Vec<Cleanup>>,
    abort: CancellationToken,
}

impl ViewModelCore {
    /// Creates a core for a view model of type `VM`.
    #[must_use]
    pub fn new<VM: 'static>(id: impl Into<ViewModelId>) -> Self {
        Self::with_kind(id.into(), ViewModelKind::of::<VM>())
    }

    /// Creates a core from a create config.
    ///
    /// The parent is resolved from the captured reference when the config
    /// carries one, through the store otherwise.
    #[must_use]
    pub fn from_config<VM: PayloadViewModel>(config: &ViewModelCreateConfig<VM>) -> Self {
        let parent = match (&config.parent_view_model, &config.store) {
            (Some(parent), _) => ParentResolver::Captured(Arc::clone(parent)),
            (None, Some(store)) => ParentResolver::Store(store.downgrade()),
            (None, None) => ParentResolver::Detached,
        };

        let mut core = Self::with_kind(config.id.clone(), config.kind);
        core.parent_id = config.parent_view_model_id.clone();
        core.parent = parent;
        core
    }

    fn with_kind(id: ViewModelId, kind: ViewModelKind) -> Self {
        Self {
            id,
            kind,
            parent_id: None,
            parent: ParentResolver::Detached,
            lifecycle: watch::Sender::new(LifecycleState::Unmounted),
            cleanups: Mutex::new(Vec::new()),
            abort: CancellationToken::new(),
        }
    }

    /// Sets the parent id.
    #[must_use]
    pub fn with_parent_id(mut self, parent_id: impl Into<ViewModelId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Resolves the parent through `store`.
    #[must_use]
    pub fn with_store(mut self, store: &ViewModelStore) -> Self {
        self.parent = ParentResolver::Store(store.downgrade());
        self
    }

    /// Sets the parent resolution strategy.
    #[must_use]
    pub fn with_parent_resolver(mut self, parent: ParentResolver) -> Self {
        self.parent = parent;
        self
    }

    /// The instance id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> &ViewModelId {
        &self.id
    }

    /// The concrete view model type.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ViewModelKind {
        self.kind
    }

    /// The parent id, if any.
    #[inline]
    #[must_use]
    pub const fn parent_view_model_id(&self) -> Option<&ViewModelId> {
        self.parent_id.as_ref()
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.lifecycle.borrow()
    }

    /// Returns `true` while mounting or mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.state().is_mounted()
    }

    /// Returns `true` once disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state().is_terminal()
    }

    /// Subscribes to lifecycle changes.
    #[must_use]
    pub fn watch_lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.subscribe()
    }

    /// A token cancelled when the view model is disposed.
    ///
    /// Hand it to spawned work that must stop with the view model.
    #[must_use]
    pub fn abort_signal(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Registers a cleanup to run once on disposal.
    ///
    /// Runs immediately if the view model is already disposed.
    pub fn add_cleanup(&self, cleanup: impl FnOnce() + Send + 'static) {
        if self.is_disposed() {
            cleanup();
            return;
        }
        self.cleanups.lock().push(Box::new(cleanup));
    }

    /// Resolves the parent view model.
    #[must_use]
    pub fn resolve_parent(&self) -> Option<Arc<dyn ViewModel>> {
        let parent_id = self.parent_id.as_ref()?;
        match &self.parent {
            ParentResolver::Detached => None,
            ParentResolver::Store(store) => store
                .upgrade()?
                .get_dyn(ViewModelLookup::Id(parent_id.clone())),
            ParentResolver::Captured(parent) => Some(Arc::clone(parent)),
        }
    }

    /// Flips the mounted flag on.
    pub fn begin_mount(&self) -> Result<(), LifecycleError> {
        self.transition(|id, state| match state {
            LifecycleState::Unmounted => Ok(LifecycleState::Mounting),
            LifecycleState::Mounting | LifecycleState::Mounted => {
                Err(LifecycleError::AlreadyMounted { id, state })
            }
            LifecycleState::Unmounting | LifecycleState::Disposed => {
                Err(LifecycleError::Disposed { id })
            }
        })
    }

    /// Marks asynchronous setup as finished.
    ///
    /// Does nothing if an unmount already started.
    pub fn finish_mount(&self) {
        self.lifecycle.send_if_modified(|state| {
            if *state == LifecycleState::Mounting {
                *state = LifecycleState::Mounted;
                true
            } else {
                false
            }
        });
    }

    /// Flips the mounted flag off.
    pub fn begin_unmount(&self) -> Result<(), LifecycleError> {
        self.transition(|id, state| match state {
            LifecycleState::Mounting | LifecycleState::Mounted => Ok(LifecycleState::Unmounting),
            LifecycleState::Unmounted | LifecycleState::Unmounting => {
                Err(LifecycleError::NotMounted { id, state })
            }
            LifecycleState::Disposed => Err(LifecycleError::Disposed { id }),
        })
    }

    /// Releases everything the view model holds and enters `Disposed`.
    ///
    /// Runs registered cleanups in registration order and cancels the abort
    /// signal. Idempotent: returns `false` if already disposed.
    pub fn dispose(&self) -> bool {
        let disposed_now = self.lifecycle.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = LifecycleState::Disposed;
                true
            }
        });
        if !disposed_now {
            return false;
        }

        self.abort.cancel();
        let cleanups = std::mem::take(&mut *self.cleanups.lock());
        debug!(id = %self.id, cleanups = cleanups.len(), "Disposing view model");
        for cleanup in cleanups {
            cleanup();
        }
        true
    }

    fn transition(
        &self,
        next: impl FnOnce(ViewModelId, LifecycleState) -> Result<LifecycleState, LifecycleError>,
    ) -> Result<(), LifecycleError> {
        let mut outcome = Ok(());
        self.lifecycle.send_if_modified(|state| match next(self.id.clone(), *state) {
            Ok(new_state) => {
                let changed = new_state != *state;
                *state = new_state;
                changed
            }
            Err(err) => {
                outcome = Err(err);
                false
            }
        });
        outcome
    }
}

impl fmt::Debug for ViewModelCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModelCore")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("parent_id", &self.parent_id)
            .field("parent", &self.parent)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::testing::{CallLog, DummyViewModel};

    #[test]
    fn test_new_core_is_unmounted() {
        let core = ViewModelCore::new::<DummyViewModel>("1");
        assert_eq!(core.id().as_str(), "1");
        assert_eq!(core.state(), LifecycleState::Unmounted);
        assert!(!core.is_mounted());
        assert_eq!(core.kind(), ViewModelKind::of::<DummyViewModel>());
    }

    #[tokio::test]
    async fn test_mount_flips_flag_then_calls_did_mount() {
        let vm = DummyViewModel::new("1");
        vm.mount().await.unwrap();

        assert!(vm.is_mounted());
        assert_eq!(vm.core().state(), LifecycleState::Mounted);
        assert_eq!(vm.log.calls(), vec!["did_mount(mounted=true)", "on_mount"]);
    }

    #[tokio::test]
    async fn test_unmount_runs_hooks_and_disposes() {
        let vm = DummyViewModel::new("1");
        vm.mount().await.unwrap();
        vm.unmount().await.unwrap();

        assert!(!vm.is_mounted());
        assert!(vm.core().is_disposed());
        assert_eq!(
            vm.log.calls(),
            vec![
                "did_mount(mounted=true)",
                "on_mount",
                "on_unmount(mounted=false)",
                "did_unmount"
            ]
        );
    }

    #[tokio::test]
    async fn test_double_mount_is_rejected() {
        let vm = DummyViewModel::new("1");
        vm.mount().await.unwrap();

        let err = vm.mount().await.unwrap_err();
        assert!(matches!(err, LifecycleError::AlreadyMounted { .. }));
        assert_eq!(vm.log.count("did_mount(mounted=true)"), 1);
    }

    #[tokio::test]
    async fn test_mount_after_dispose_is_rejected() {
        let vm = DummyViewModel::new("1");
        vm.mount().await.unwrap();
        vm.unmount().await.unwrap();

        let err = vm.mount().await.unwrap_err();
        assert!(err.is_use_after_dispose());
        assert!(!vm.is_mounted());
    }

    #[tokio::test]
    async fn test_unmount_without_mount_is_rejected() {
        let vm = DummyViewModel::new("1");
        let err = vm.unmount().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::NotMounted {
                state: LifecycleState::Unmounted,
                ..
            }
        ));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let core = ViewModelCore::new::<DummyViewModel>("1");
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        core.add_cleanup(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let token = core.abort_signal();

        assert!(core.dispose());
        assert!(!core.dispose());
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cleanup_after_dispose_runs_immediately() {
        let core = ViewModelCore::new::<DummyViewModel>("1");
        core.dispose();

        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        core.add_cleanup(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_payload_changed_fires_once_per_distinct_value() {
        let vm = DummyViewModel::new("1");

        assert!(vm.set_payload(CallLog::payload(1)));
        assert!(!vm.set_payload(CallLog::payload(1)));
        assert!(vm.set_payload(CallLog::payload(2)));

        assert_eq!(vm.log.payloads(), vec![CallLog::payload(1), CallLog::payload(2)]);
        assert_eq!(vm.payload(), CallLog::payload(2));
    }

    #[tokio::test]
    async fn test_watch_lifecycle_observes_transitions() {
        let vm = DummyViewModel::new("1");
        let mut rx = vm.core().watch_lifecycle();

        vm.mount().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), LifecycleState::Mounted);
    }

    #[test]
    fn test_no_parent_without_parent_id() {
        let vm = DummyViewModel::new("child");
        assert!(vm.parent_view_model_id().is_none());
        assert!(vm.parent_view_model().is_none());
    }

    #[test]
    fn test_captured_parent_resolves_synchronously() {
        let parent: Arc<dyn ViewModel> = Arc::new(DummyViewModel::new("parent"));
        let core = ViewModelCore::new::<DummyViewModel>("child")
            .with_parent_id("parent")
            .with_parent_resolver(ParentResolver::Captured(Arc::clone(&parent)));

        let resolved = core.resolve_parent().unwrap();
        assert_eq!(resolved.id().as_str(), "parent");
    }

    #[test]
    fn test_dyn_debug_includes_id() {
        let vm: Arc<dyn ViewModel> = Arc::new(DummyViewModel::new("dbg"));
        assert!(format!("{vm:?}").contains("dbg"));
    }
}
