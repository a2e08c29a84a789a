//! View models used by the binding tests.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use mvvm_store::{
    FromCreateConfig, PayloadCell, PayloadViewModel, ViewModel, ViewModelCore,
    ViewModelCreateConfig,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug)]
pub struct Card {
    core: ViewModelCore,
    payload: PayloadCell<u32>,
    changes: Mutex<Vec<u32>>,
    mount_gate: Option<Arc<Notify>>,
}

impl Card {
    pub fn new(id: &str) -> Self {
        Self::from_create_config(ViewModelCreateConfig::new(id, 0))
    }

    /// Makes `on_mount` wait until `gate` is notified.
    pub fn with_mount_gate(mut self, gate: Arc<Notify>) -> Self {
        self.mount_gate = Some(gate);
        self
    }

    pub fn changes(&self) -> Vec<u32> {
        self.changes.lock().clone()
    }
}

impl ViewModel for Card {
    fn core(&self) -> &ViewModelCore {
        &self.core
    }

    fn on_mount(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Some(gate) = &self.mount_gate {
                gate.notified().await;
            }
        })
    }
}

impl PayloadViewModel for Card {
    type Payload = u32;

    fn payload_cell(&self) -> &PayloadCell<u32> {
        &self.payload
    }

    fn payload_changed(&self, payload: &u32) {
        self.changes.lock().push(*payload);
    }
}

impl FromCreateConfig for Card {
    fn from_create_config(config: ViewModelCreateConfig<Self>) -> Self {
        Self {
            core: ViewModelCore::from_config(&config),
            payload: PayloadCell::new(config.payload),
            changes: Mutex::default(),
            mount_gate: None,
        }
    }
}

#[derive(Debug)]
pub struct Label {
    core: ViewModelCore,
}

impl ViewModel for Label {
    fn core(&self) -> &ViewModelCore {
        &self.core
    }
}
