//! Scenario execution.
//!
//! The simulator plays the part of a UI framework: it owns bound nodes,
//! renders them into nested scopes, and runs their mount and unmount effects.
//! Background mounts run as tasks so later steps can observe render gating.

use std::fmt;

use futures_util::future::BoxFuture;
use mvvm_binding::{BindingError, BoundView, RenderOutcome, RenderProps, RenderScope};
use mvvm_core::{ComponentId, FxHashMap, ViewModelId, ViewModelLookup, fx_hash_map_with_capacity};
use mvvm_store::{StoreEvent, StoreSnapshot, ViewModelStore};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::demo::DemoViewModel;
use crate::scenario::{LookupKey, Scenario, SimError, Step};

/// Attach work split off a node's mount.
pub type MountEffect = BoxFuture<'static, Result<(), BindingError>>;

/// A binding with its view model type erased.
pub trait SimBinding: Send + Sync {
    /// Creates a node that has not rendered yet.
    fn node(&self) -> Box<dyn SimNode>;

    /// The binding's component identity.
    fn component(&self) -> ComponentId;
}

/// What a node render produced.
#[derive(Debug)]
pub struct NodeRender {
    /// The node's id.
    pub id: Option<ViewModelId>,
    /// The scope for children, on a ready render.
    pub child_scope: Option<RenderScope>,
    /// The fallback label, on a gated render.
    pub fallback: Option<String>,
    /// Whether the payload sync changed the view model.
    pub payload_changed: bool,
}

/// A bound node with its view model type erased.
pub trait SimNode: Send {
    /// Renders, then syncs the payload.
    fn render(&mut self, scope: &RenderScope, payload: Value, props: Map<String, Value>) -> NodeRender;

    /// Marks the node attached and returns its attach work, if any is left.
    fn mount(&mut self) -> Result<Option<MountEffect>, BindingError>;

    /// Runs the unmount cleanup.
    fn unmount(self: Box<Self>) -> BoxFuture<'static, Result<(), BindingError>>;
}

impl<VM: DemoViewModel> SimNode for BoundView<VM> {
    fn render(&mut self, scope: &RenderScope, payload: Value, props: Map<String, Value>) -> NodeRender {
        let outcome = BoundView::render(self, scope, &RenderProps { payload, props });
        let payload_changed = self.sync_payload();
        let id = self.id().cloned();
        let (child_scope, fallback) = match outcome {
            RenderOutcome::Ready { scope, .. } => (Some(scope), None),
            RenderOutcome::Fallback(fallback) => (
                None,
                Some(fallback.map_or_else(|| "nothing".to_owned(), |f| f.label().to_owned())),
            ),
        };
        NodeRender {
            id,
            child_scope,
            fallback,
            payload_changed,
        }
    }

    fn mount(&mut self) -> Result<Option<MountEffect>, BindingError> {
        Ok(self.mount_effect()?.map(|effect| Box::pin(effect) as MountEffect))
    }

    fn unmount(self: Box<Self>) -> BoxFuture<'static, Result<(), BindingError>> {
        Box::pin(BoundView::unmount(*self))
    }
}

struct NodeState {
    node: Box<dyn SimNode>,
    parent: Option<String>,
    child_scope: Option<RenderScope>,
}

/// One executed step.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    /// One-based step number.
    pub step: usize,
    /// The operation.
    pub op: &'static str,
    /// The node acted on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// What happened.
    pub outcome: String,
    /// Store events emitted during the step.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<StoreEvent>,
    /// The snapshot taken by a `snapshot` step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<StoreSnapshot>,
}

impl fmt::Display for TimelineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>3}. {:<8}", self.step, self.op)?;
        if let Some(node) = &self.node {
            write!(f, " [{node}]")?;
        }
        write!(f, " {}", self.outcome)?;
        for event in &self.events {
            write!(f, "\n       - {event}")?;
        }
        Ok(())
    }
}

/// The result of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    /// Executed steps.
    pub timeline: Vec<TimelineEntry>,
    /// The store state after the last step.
    pub snapshot: StoreSnapshot,
}

/// Replays scenarios against a store.
pub struct Simulator {
    store: ViewModelStore,
    root: RenderScope,
    bindings: FxHashMap<String, Box<dyn SimBinding>>,
    nodes: FxHashMap<String, NodeState>,
    mounting: Vec<(String, JoinHandle<Result<(), BindingError>>)>,
    events: broadcast::Receiver<StoreEvent>,
}

impl Simulator {
    /// Creates a simulator for `scenario` over `store`.
    #[must_use]
    pub fn new(store: ViewModelStore, scenario: &Scenario) -> Self {
        let bindings = scenario
            .bindings
            .iter()
            .map(|(name, spec)| (name.clone(), spec.kind.binding(spec)))
            .collect();
        // Only renders that name a binding create nodes.
        let node_count = scenario
            .steps
            .iter()
            .filter(|step| matches!(step, Step::Render { binding: Some(_), .. }))
            .count();
        let events = store.subscribe();
        Self {
            root: RenderScope::with_store(store.clone()),
            store,
            bindings,
            nodes: fx_hash_map_with_capacity(node_count),
            mounting: Vec::new(),
            events,
        }
    }

    /// Runs every step, then waits for outstanding background mounts.
    ///
    /// Nodes never unmounted stay attached and show up in the final snapshot.
    pub async fn run(mut self, scenario: &Scenario) -> Result<SimReport, SimError> {
        let mut timeline = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            let number = index + 1;
            debug!(step = number, op = step.op(), "Running step");
            let (outcome, snapshot) = self.step(number, step).await?;
            timeline.push(TimelineEntry {
                step: number,
                op: step.op(),
                node: step.node().map(str::to_owned),
                outcome,
                events: self.drain_events(),
                snapshot,
            });
        }

        self.settle().await?;
        info!(steps = timeline.len(), "Scenario finished");
        Ok(SimReport {
            timeline,
            snapshot: self.store.snapshot(),
        })
    }

    async fn step(&mut self, number: usize, step: &Step) -> Result<(String, Option<StoreSnapshot>), SimError> {
        let wrap = move |source| SimError::Binding { step: number, source };
        let outcome = match step {
            Step::Render {
                node,
                binding,
                parent,
                payload,
                props,
            } => self.render(node, binding.as_deref(), parent.as_deref(), payload, props)?,
            Step::Mount { node, background } => {
                let effect = self.node_mut(node)?.node.mount().map_err(wrap)?;
                match effect {
                    None => "already mounted".to_owned(),
                    Some(effect) if *background => {
                        self.mounting.push((node.clone(), tokio::spawn(effect)));
                        // Let the mount reach its first await so the store sees it.
                        tokio::task::yield_now().await;
                        "mount started".to_owned()
                    }
                    Some(effect) => {
                        effect.await.map_err(wrap)?;
                        "mounted".to_owned()
                    }
                }
            }
            Step::Settle => {
                let settled = self.settle().await?;
                format!("{settled} background mount(s) settled")
            }
            Step::Unmount { node } => {
                let state = self
                    .nodes
                    .remove(node)
                    .ok_or_else(|| SimError::UnknownNode(node.clone()))?;
                state.node.unmount().await.map_err(wrap)?;
                "unmounted".to_owned()
            }
            Step::Lookup { from, expect, by } => {
                let scope = match from {
                    Some(from) => self.child_scope(from)?,
                    None => self.root.clone(),
                };
                let lookup = by.as_ref().map(|key| self.lookup_key(key)).transpose()?;
                match expect.lookup(&scope, lookup) {
                    Ok(id) => format!("found {id}"),
                    Err(err) => format!("error: {err}"),
                }
            }
            Step::Snapshot => {
                let snapshot = self.store.snapshot();
                let outcome = format!(
                    "{} live, {} mounted view(s)",
                    snapshot.instances.len(),
                    snapshot.mounted_views
                );
                return Ok((outcome, Some(snapshot)));
            }
            Step::Clean => {
                self.store.clean();
                "store cleaned".to_owned()
            }
        };
        Ok((outcome, None))
    }

    fn render(
        &mut self,
        node: &str,
        binding: Option<&str>,
        parent: Option<&str>,
        payload: &Value,
        props: &Map<String, Value>,
    ) -> Result<String, SimError> {
        if !self.nodes.contains_key(node) {
            let name = binding.ok_or_else(|| SimError::MissingBinding(node.to_owned()))?;
            let binding = self
                .bindings
                .get(name)
                .ok_or_else(|| SimError::UnknownBinding(name.to_owned()))?;
            self.nodes.insert(
                node.to_owned(),
                NodeState {
                    node: binding.node(),
                    parent: parent.map(str::to_owned),
                    child_scope: None,
                },
            );
        }

        let parent = self.node_mut(node)?.parent.clone();
        let scope = match &parent {
            Some(parent) => self.child_scope(parent)?,
            None => self.root.clone(),
        };

        let state = self.node_mut(node)?;
        let render = state.node.render(&scope, payload.clone(), props.clone());
        state.child_scope = render.child_scope;

        let id = render.id.map_or_else(String::new, |id| id.to_string());
        let mut outcome = match render.fallback {
            Some(fallback) => format!("{id}: fallback ({fallback})"),
            None => format!("{id}: ready"),
        };
        if render.payload_changed {
            outcome.push_str(", payload changed");
        }
        Ok(outcome)
    }

    fn node_mut(&mut self, node: &str) -> Result<&mut NodeState, SimError> {
        self.nodes
            .get_mut(node)
            .ok_or_else(|| SimError::UnknownNode(node.to_owned()))
    }

    fn child_scope(&self, node: &str) -> Result<RenderScope, SimError> {
        let state = self
            .nodes
            .get(node)
            .ok_or_else(|| SimError::UnknownNode(node.to_owned()))?;
        state
            .child_scope
            .clone()
            .ok_or_else(|| SimError::ParentNotReady(node.to_owned()))
    }

    fn lookup_key(&self, key: &LookupKey) -> Result<ViewModelLookup, SimError> {
        Ok(match key {
            LookupKey::Id(id) => ViewModelLookup::from(id.as_str()),
            LookupKey::Kind(kind) => ViewModelLookup::Kind(kind.view_model_kind()),
            LookupKey::Binding(name) => {
                let binding = self
                    .bindings
                    .get(name)
                    .ok_or_else(|| SimError::UnknownBinding(name.clone()))?;
                ViewModelLookup::Component(binding.component())
            }
        })
    }

    /// Waits for every background mount. Returns how many there were.
    async fn settle(&mut self) -> Result<usize, SimError> {
        let mounting = std::mem::take(&mut self.mounting);
        let count = mounting.len();
        for (node, task) in mounting {
            let result = task.await.map_err(|err| SimError::Task {
                node: node.clone(),
                message: err.to_string(),
            })?;
            result.map_err(|source| SimError::Mount { node, source })?;
        }
        Ok(count)
    }

    fn drain_events(&mut self) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("store", &self.store)
            .field("nodes", &self.nodes.len())
            .field("mounting", &self.mounting.len())
            .finish_non_exhaustive()
    }
}
