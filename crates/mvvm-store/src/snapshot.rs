//! Serializable point-in-time view of a store.

use mvvm_core::{ComponentId, LifecycleState, ViewModelId};
use serde::Serialize;

use crate::store::StoreState;

/// One live view model in a [`StoreSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSnapshot {
    /// The view model id.
    pub id: ViewModelId,
    /// Short type name.
    pub kind: &'static str,
    /// Current reference count.
    pub attached: usize,
    /// Lifecycle state of the instance.
    pub lifecycle: LifecycleState,
    /// Whether a mount is in flight.
    pub mounting: bool,
    /// Whether an unmount is in flight.
    pub unmounting: bool,
}

/// A component identity linked to a view model type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentLink {
    /// The component identity.
    pub component: ComponentId,
    /// Short type name of the linked view model type.
    pub kind: &'static str,
}

/// Point-in-time copy of a store's registry state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreSnapshot {
    /// Live instances, sorted by id.
    pub instances: Vec<InstanceSnapshot>,
    /// Sum of all reference counts.
    pub mounted_views: usize,
    /// Component links, sorted by component.
    pub linked_components: Vec<ComponentLink>,
}

impl StoreSnapshot {
    pub(crate) fn capture(state: &StoreState) -> Self {
        let mut instances: Vec<_> = state
            .instances
            .iter()
            .map(|(id, vm)| InstanceSnapshot {
                id: id.clone(),
                kind: vm.kind().short_name(),
                attached: state.attached_counts.get(id).copied().unwrap_or(0),
                lifecycle: vm.core().state(),
                mounting: state.mounting.contains_key(id),
                unmounting: state.unmounting.contains_key(id),
            })
            .collect();
        instances.sort_by(|a, b| a.id.cmp(&b.id));

        let mut linked_components: Vec<_> = state
            .linked_components
            .iter()
            .map(|(component, kind)| ComponentLink {
                component: *component,
                kind: kind.short_name(),
            })
            .collect();
        linked_components.sort_by_key(|link| link.component);

        Self {
            instances,
            mounted_views: state.attached_counts.values().sum(),
            linked_components,
        }
    }

    /// Returns the snapshot of one instance.
    #[must_use]
    pub fn instance(&self, id: &str) -> Option<&InstanceSnapshot> {
        self.instances.iter().find(|i| i.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mvvm_core::ViewModelKind;

    use crate::testing::{OtherViewModel, DummyViewModel};
    use crate::ViewModelStore;

    #[tokio::test]
    async fn test_snapshot_json() {
        let store = ViewModelStore::new();
        store.attach(Arc::new(DummyViewModel::new("b"))).await.unwrap();
        store.attach(Arc::new(OtherViewModel::new("a"))).await.unwrap();
        store.attach(Arc::new(OtherViewModel::new("a"))).await.unwrap();
        store.link_components(
            ViewModelKind::of::<DummyViewModel>(),
            [mvvm_core::ComponentId(7)],
        );

        insta::assert_json_snapshot!(store.snapshot(), @r#"
        {
          "instances": [
            {
              "id": "a",
              "kind": "OtherViewModel",
              "attached": 2,
              "lifecycle": "mounted",
              "mounting": false,
              "unmounting": false
            },
            {
              "id": "b",
              "kind": "DummyViewModel",
              "attached": 1,
              "lifecycle": "mounted",
              "mounting": false,
              "unmounting": false
            }
          ],
          "mounted_views": 3,
          "linked_components": [
            {
              "component": 7,
              "kind": "DummyViewModel"
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = ViewModelStore::new().snapshot();
        assert!(snapshot.instances.is_empty());
        assert_eq!(snapshot.mounted_views, 0);
        assert!(snapshot.instance("x").is_none());
    }
}
