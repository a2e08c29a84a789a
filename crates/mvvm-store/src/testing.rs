//! Test doubles shared by the store tests.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::create_config::ViewModelCreateConfig;
use crate::payload::PayloadCell;
use crate::view_model::{FromCreateConfig, PayloadViewModel, ViewModel, ViewModelCore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DummyPayload {
    pub x: u32,
}

/// Records every hook call and payload change.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
    payloads: Mutex<Vec<DummyPayload>>,
}

impl CallLog {
    pub const fn payload(x: u32) -> DummyPayload {
        DummyPayload { x }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn payloads(&self) -> Vec<DummyPayload> {
        self.payloads.lock().clone()
    }
}

pub struct DummyViewModel {
    core: ViewModelCore,
    payload: PayloadCell<DummyPayload>,
    pub log: Arc<CallLog>,
    mount_gate: Option<Arc<Notify>>,
    unmount_gate: Option<Arc<Notify>>,
}

impl DummyViewModel {
    pub fn new(id: &str) -> Self {
        Self {
            core: ViewModelCore::new::<Self>(id),
            payload: PayloadCell::default(),
            log: Arc::default(),
            mount_gate: None,
            unmount_gate: None,
        }
    }

    /// Makes `on_mount` wait until `gate` is notified.
    pub fn with_mount_gate(mut self, gate: Arc<Notify>) -> Self {
        self.mount_gate = Some(gate);
        self
    }

    /// Makes `on_unmount` wait until `gate` is notified.
    pub fn with_unmount_gate(mut self, gate: Arc<Notify>) -> Self {
        self.unmount_gate = Some(gate);
        self
    }

    pub fn with_core(mut self, core: ViewModelCore) -> Self {
        self.core = core;
        self
    }
}

impl ViewModel for DummyViewModel {
    fn core(&self) -> &ViewModelCore {
        &self.core
    }

    fn did_mount(&self) {
        self.log
            .record(format!("did_mount(mounted={})", self.is_mounted()));
    }

    fn on_mount(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Some(gate) = &self.mount_gate {
                gate.notified().await;
            }
            self.log.record("on_mount");
        })
    }

    fn on_unmount(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.log
                .record(format!("on_unmount(mounted={})", self.is_mounted()));
            if let Some(gate) = &self.unmount_gate {
                gate.notified().await;
            }
        })
    }

    fn did_unmount(&self) {
        self.log.record("did_unmount");
    }
}

impl PayloadViewModel for DummyViewModel {
    type Payload = DummyPayload;

    fn payload_cell(&self) -> &PayloadCell<DummyPayload> {
        &self.payload
    }

    fn payload_changed(&self, payload: &DummyPayload) {
        self.log.payloads.lock().push(payload.clone());
    }
}

impl FromCreateConfig for DummyViewModel {
    fn from_create_config(config: ViewModelCreateConfig<Self>) -> Self {
        Self {
            core: ViewModelCore::from_config(&config),
            payload: PayloadCell::new(config.payload),
            log: Arc::default(),
            mount_gate: None,
            unmount_gate: None,
        }
    }
}

/// A second view model type for kind lookups.
pub struct OtherViewModel {
    core: ViewModelCore,
    payload: PayloadCell<()>,
}

impl OtherViewModel {
    pub fn new(id: &str) -> Self {
        Self {
            core: ViewModelCore::new::<Self>(id),
            payload: PayloadCell::new(()),
        }
    }
}

impl ViewModel for OtherViewModel {
    fn core(&self) -> &ViewModelCore {
        &self.core
    }
}

impl PayloadViewModel for OtherViewModel {
    type Payload = ();

    fn payload_cell(&self) -> &PayloadCell<()> {
        &self.payload
    }
}
