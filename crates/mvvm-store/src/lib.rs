//! View model base and reference-counted registry.
//!
//! This crate holds the framework-agnostic half of mvvm-bind:
//!
//! - [`ViewModel`] / [`PayloadViewModel`]: the controller contract, with the
//!   shared state in [`ViewModelCore`]
//! - [`ViewModelStore`]: the registry that owns live instances, counts how
//!   many views use each one and drives mount/unmount on the edges
//! - [`StoreEvent`] / [`StoreSnapshot`]: observation of the registry
//!
//! # Architecture
//!
//! ```text
//! ViewModelStore (Arc<inner>, cheap clone)
//!     │
//!     ├── StoreState (RwLock)
//!     │       ├── instances        id → Arc<dyn ViewModel>
//!     │       ├── attached_counts  id → usize
//!     │       ├── ids_by_kind      ViewModelKind → ids in attach order
//!     │       ├── linked_components ComponentId → ViewModelKind
//!     │       └── mounting / unmounting
//!     │
//!     ├── transition locks (per-id tokio Mutex)
//!     │
//!     └── events (broadcast::Sender<StoreEvent>)
//! ```
//!
//! A view model embeds a [`ViewModelCore`]; the core owns the lifecycle
//! state machine, disposal resources and parent resolution, so implementors
//! only write hooks.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod create_config;
mod error;
mod events;
mod payload;
mod snapshot;
mod store;
mod view_model;

#[cfg(test)]
mod testing;

pub use create_config::{Fallback, GenerateIdConfig, ViewModelCreateConfig};
pub use error::StoreError;
pub use events::StoreEvent;
pub use payload::PayloadCell;
pub use snapshot::{ComponentLink, InstanceSnapshot, StoreSnapshot};
pub use store::{ViewModelStore, WeakViewModelStore};
pub use view_model::{
    AsAny, FromCreateConfig, ParentResolver, PayloadViewModel, ViewModel, ViewModelCore,
};
