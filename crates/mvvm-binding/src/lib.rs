//! Binding adapter and lookup hook for mvvm-bind.
//!
//! The store knows nothing about rendering. This crate connects it to a view
//! tree without depending on any UI framework: the host drives each bound
//! node explicitly and passes a [`RenderScope`] down instead of relying on
//! ambient context.
//!
//! # Example
//!
//! ```
//! use mvvm_binding::{BindingConfig, RenderProps, RenderScope, ViewModelBinding, use_view_model};
//! use mvvm_store::{
//!     FromCreateConfig, PayloadCell, PayloadViewModel, ViewModel, ViewModelCore,
//!     ViewModelCreateConfig, ViewModelStore,
//! };
//!
//! #[derive(Debug)]
//! struct Profile {
//!     core: ViewModelCore,
//!     name: PayloadCell<String>,
//! }
//!
//! impl ViewModel for Profile {
//!     fn core(&self) -> &ViewModelCore {
//!         &self.core
//!     }
//! }
//!
//! impl PayloadViewModel for Profile {
//!     type Payload = String;
//!
//!     fn payload_cell(&self) -> &PayloadCell<String> {
//!         &self.name
//!     }
//! }
//!
//! impl FromCreateConfig for Profile {
//!     fn from_create_config(config: ViewModelCreateConfig<Self>) -> Self {
//!         Self {
//!             core: ViewModelCore::from_config(&config),
//!             name: PayloadCell::new(config.payload),
//!         }
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let root = RenderScope::with_store(ViewModelStore::new());
//! let profile = ViewModelBinding::<Profile>::new(BindingConfig::new().with_fallback("loading"));
//!
//! let mut node = profile.node();
//! let props = RenderProps::new("ada".to_owned());
//!
//! // Nothing is registered before the mount effect runs.
//! assert!(!node.render(&root, &props).is_ready());
//! node.did_mount().await.unwrap();
//!
//! let outcome = node.render(&root, &props);
//! let scope = outcome.scope().unwrap();
//! let vm = use_view_model::<Profile>(scope, None).unwrap();
//! assert_eq!(vm.payload(), "ada");
//!
//! node.unmount().await.unwrap();
//! # });
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod binding;
mod error;
mod lookup;
mod scope;

#[cfg(test)]
mod testing;

pub use binding::{
    BindingConfig, BoundView, Factory, GetPayload, OnRender, RenderOutcome, RenderProps,
    ViewModelBinding,
};
pub use error::{BindingError, LookupError};
pub use lookup::use_view_model;
pub use scope::RenderScope;
