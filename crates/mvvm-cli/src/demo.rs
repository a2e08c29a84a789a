//! View model types available to scenarios.
//!
//! All demo view models take a JSON payload and log their lifecycle. A
//! binding can give them an artificial mount delay to make render gating
//! observable.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use mvvm_binding::{BindingConfig, LookupError, RenderScope, ViewModelBinding, use_view_model};
use mvvm_core::{ViewModelId, ViewModelKind, ViewModelLookup};
use mvvm_store::{
    FromCreateConfig, PayloadCell, PayloadViewModel, ViewModel, ViewModelCore,
    ViewModelCreateConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::scenario::BindingSpec;
use crate::sim::{SimBinding, SimNode};

/// A view model usable from a scenario.
pub trait DemoViewModel: FromCreateConfig<Payload = Value> {
    /// Delays `on_mount` by `delay`.
    #[must_use]
    fn with_mount_delay(self, delay: Duration) -> Self;
}

macro_rules! demo_view_model {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            core: ViewModelCore,
            payload: PayloadCell<Value>,
            mount_delay: Option<Duration>,
        }

        impl ViewModel for $name {
            fn core(&self) -> &ViewModelCore {
                &self.core
            }

            fn did_mount(&self) {
                debug!(id = %self.id(), kind = stringify!($name), "did_mount");
            }

            fn on_mount(&self) -> BoxFuture<'_, ()> {
                Box::pin(async move {
                    if let Some(delay) = self.mount_delay {
                        tokio::time::sleep(delay).await;
                    }
                    info!(id = %self.id(), kind = stringify!($name), "Mounted");
                })
            }

            fn did_unmount(&self) {
                info!(id = %self.id(), kind = stringify!($name), "Unmounted");
            }
        }

        impl PayloadViewModel for $name {
            type Payload = Value;

            fn payload_cell(&self) -> &PayloadCell<Value> {
                &self.payload
            }

            fn payload_changed(&self, payload: &Value) {
                debug!(id = %self.id(), %payload, "Payload changed");
            }
        }

        impl FromCreateConfig for $name {
            fn from_create_config(config: ViewModelCreateConfig<Self>) -> Self {
                Self {
                    core: ViewModelCore::from_config(&config),
                    payload: PayloadCell::new(config.payload),
                    mount_delay: None,
                }
            }
        }

        impl DemoViewModel for $name {
            fn with_mount_delay(mut self, delay: Duration) -> Self {
                self.mount_delay = Some(delay);
                self
            }
        }
    };
}

demo_view_model!(
    /// A page: the usual root of a scenario tree.
    PageViewModel
);

demo_view_model!(
    /// A panel inside a page.
    PanelViewModel
);

demo_view_model!(
    /// A leaf widget.
    WidgetViewModel
);

/// The demo view model types, as named in scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoKind {
    /// [`PageViewModel`].
    Page,
    /// [`PanelViewModel`].
    Panel,
    /// [`WidgetViewModel`].
    Widget,
}

impl DemoKind {
    /// The type identity of the view model.
    #[must_use]
    pub fn view_model_kind(self) -> ViewModelKind {
        match self {
            Self::Page => ViewModelKind::of::<PageViewModel>(),
            Self::Panel => ViewModelKind::of::<PanelViewModel>(),
            Self::Widget => ViewModelKind::of::<WidgetViewModel>(),
        }
    }

    /// Builds a binding for this kind.
    #[must_use]
    pub fn binding(self, spec: &BindingSpec) -> Box<dyn SimBinding> {
        match self {
            Self::Page => Box::new(build_binding::<PageViewModel>(spec)),
            Self::Panel => Box::new(build_binding::<PanelViewModel>(spec)),
            Self::Widget => Box::new(build_binding::<WidgetViewModel>(spec)),
        }
    }

    /// Runs the lookup hook expecting this kind.
    pub fn lookup(
        self,
        scope: &RenderScope,
        lookup: Option<ViewModelLookup>,
    ) -> Result<ViewModelId, LookupError> {
        match self {
            Self::Page => use_view_model::<PageViewModel>(scope, lookup).map(|vm| vm.id().clone()),
            Self::Panel => use_view_model::<PanelViewModel>(scope, lookup).map(|vm| vm.id().clone()),
            Self::Widget => {
                use_view_model::<WidgetViewModel>(scope, lookup).map(|vm| vm.id().clone())
            }
        }
    }
}

fn build_binding<VM: DemoViewModel>(spec: &BindingSpec) -> ViewModelBinding<VM> {
    let mut config = BindingConfig::<VM>::new();
    if let Some(id) = &spec.id {
        config = config.with_id(id.as_str());
    }
    if let Some(fallback) = &spec.fallback {
        config = config.with_fallback(fallback.as_str());
    }
    if let Some(delay) = spec.mount_delay_ms.map(Duration::from_millis) {
        config = config.with_factory(move |create| Arc::new(VM::from_create_config(create).with_mount_delay(delay)));
    }
    if let Some(field) = spec.payload_from.clone() {
        config = config.with_get_payload(move |props| {
            props
                .props
                .get(&field)
                .cloned()
                .unwrap_or_else(|| props.payload.clone())
        });
    }
    ViewModelBinding::new(config)
}

impl<VM: DemoViewModel> SimBinding for ViewModelBinding<VM> {
    fn node(&self) -> Box<dyn SimNode> {
        Box::new(ViewModelBinding::node(self))
    }

    fn component(&self) -> mvvm_core::ComponentId {
        ViewModelBinding::component(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        assert_ne!(DemoKind::Page.view_model_kind(), DemoKind::Widget.view_model_kind());
        assert_eq!(DemoKind::Panel.view_model_kind().short_name(), "PanelViewModel");
    }

    #[test]
    fn test_kind_names_in_scenarios() {
        let kind: DemoKind = serde_json::from_str(r#""widget""#).unwrap();
        assert_eq!(kind, DemoKind::Widget);
    }
}
