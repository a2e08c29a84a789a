//! Core types, errors, configuration and id generation for mvvm-bind.
//!
//! This crate provides the foundational pieces used across the workspace:
//!
//! - Identifiers ([`ViewModelId`], [`ComponentId`]) and type identity
//!   ([`ViewModelKind`]) for view models
//! - Lookup keys ([`ViewModelLookup`])
//! - The lifecycle state machine states ([`LifecycleState`])
//! - Id generation ([`IdGenerator`], [`IdScope`])
//! - Error types ([`ConfigError`], [`LifecycleError`])
//! - Configuration ([`Config`], [`StoreConfig`], [`IdConfig`])
//! - Type aliases for `FxHashMap`/`FxHashSet`

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod id_gen;
pub mod types;

pub use config::{Config, IdConfig, LifecyclePolicy, StoreConfig};
pub use error::{ConfigError, LifecycleError};
pub use hash::{fx_hash_map_with_capacity, FxHashMap, FxHashSet};
pub use id_gen::{IdGenerator, IdScope};
pub use types::{ComponentId, LifecycleState, ViewModelId, ViewModelKind, ViewModelLookup};
