//! Domain types shared by the store and the binding layer.
//!
//! # Module Organization
//!
//! - [`id`] - View model instance identifiers
//! - [`kind`] - Type identity used for "lookup by class"
//! - [`lookup`] - Lookup keys and component identities
//! - [`lifecycle`] - The mount/unmount state machine states
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use mvvm_core::{ComponentId, LifecycleState, ViewModelId, ViewModelKind, ViewModelLookup};
//! ```

pub mod id;
pub mod kind;
pub mod lifecycle;
pub mod lookup;

pub use id::ViewModelId;
pub use kind::ViewModelKind;
pub use lifecycle::LifecycleState;
pub use lookup::{ComponentId, ViewModelLookup};
