//! Scenario file format.
//!
//! A scenario declares bindings and a list of steps that drive bound nodes
//! through their render cycle:
//!
//! ```json
//! {
//!   "bindings": {
//!     "page": { "kind": "page", "id": "home" },
//!     "card": { "kind": "widget", "fallback": "loading", "mount_delay_ms": 5 }
//!   },
//!   "steps": [
//!     { "op": "render", "node": "root", "binding": "page" },
//!     { "op": "mount", "node": "root" },
//!     { "op": "render", "node": "root" },
//!     { "op": "render", "node": "a", "binding": "card", "parent": "root", "payload": { "n": 1 } },
//!     { "op": "mount", "node": "a", "background": true },
//!     { "op": "render", "node": "a" },
//!     { "op": "settle" },
//!     { "op": "lookup", "from": "a", "expect": "page", "by": { "kind": "page" } },
//!     { "op": "unmount", "node": "a" }
//!   ]
//! }
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use mvvm_binding::BindingError;
use mvvm_core::FxHashMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::demo::DemoKind;

/// Errors that abort a scenario run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A step names a binding the scenario does not declare.
    #[error("unknown binding \"{0}\"")]
    UnknownBinding(String),

    /// A step names a node that was never rendered.
    #[error("unknown node \"{0}\"")]
    UnknownNode(String),

    /// A node was first rendered without naming its binding.
    #[error("node \"{0}\" is rendered for the first time without a binding")]
    MissingBinding(String),

    /// A parent node has not produced a ready render yet.
    #[error("node \"{0}\" has no ready render to nest under")]
    ParentNotReady(String),

    /// The binding layer rejected a step.
    #[error("step {step}: {source}")]
    Binding {
        /// One-based step number.
        step: usize,
        /// The underlying error.
        #[source]
        source: BindingError,
    },

    /// A background mount was rejected.
    #[error("background mount of \"{node}\" failed: {source}")]
    Mount {
        /// The node being mounted.
        node: String,
        /// The underlying error.
        #[source]
        source: BindingError,
    },

    /// A background mount task panicked or was cancelled.
    #[error("background mount of \"{node}\" did not finish: {message}")]
    Task {
        /// The node being mounted.
        node: String,
        /// The join error.
        message: String,
    },

    /// Reading a file failed.
    #[error("failed to read {path}")]
    Io {
        /// The file path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The scenario is not valid JSON for this format.
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How a binding is set up.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSpec {
    /// The view model type.
    pub kind: DemoKind,

    /// A fixed id shared by every node of the binding.
    #[serde(default)]
    pub id: Option<String>,

    /// Fallback label rendered while mounting.
    #[serde(default)]
    pub fallback: Option<String>,

    /// Artificial mount delay.
    #[serde(default)]
    pub mount_delay_ms: Option<u64>,

    /// Take the payload from this raw prop instead of `payload`.
    #[serde(default)]
    pub payload_from: Option<String>,
}

/// A lookup key as written in a scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKey {
    /// A literal id.
    Id(String),
    /// The latest instance of a kind.
    Kind(DemoKind),
    /// The instance linked to a binding's component identity.
    Binding(String),
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Renders a node, creating it on first use, then syncs its payload.
    Render {
        /// Node name.
        node: String,
        /// Binding name, required on first render.
        #[serde(default)]
        binding: Option<String>,
        /// Parent node name. The root scope is used when absent.
        #[serde(default)]
        parent: Option<String>,
        /// The payload.
        #[serde(default)]
        payload: Value,
        /// Other raw props.
        #[serde(default)]
        props: Map<String, Value>,
    },

    /// Runs a node's mount effect.
    Mount {
        /// Node name.
        node: String,
        /// Start the mount without waiting for it.
        #[serde(default)]
        background: bool,
    },

    /// Waits for every background mount.
    Settle,

    /// Unmounts a node.
    Unmount {
        /// Node name.
        node: String,
    },

    /// Runs the lookup hook.
    Lookup {
        /// Look up from inside this node's subtree. The root scope otherwise.
        #[serde(default)]
        from: Option<String>,
        /// The expected view model type.
        expect: DemoKind,
        /// The key. The nearest active view model when absent.
        #[serde(default)]
        by: Option<LookupKey>,
    },

    /// Records a store snapshot.
    Snapshot,

    /// Resets the store without running hooks.
    Clean,
}

impl Step {
    /// The operation name.
    #[must_use]
    pub const fn op(&self) -> &'static str {
        match self {
            Self::Render { .. } => "render",
            Self::Mount { .. } => "mount",
            Self::Settle => "settle",
            Self::Unmount { .. } => "unmount",
            Self::Lookup { .. } => "lookup",
            Self::Snapshot => "snapshot",
            Self::Clean => "clean",
        }
    }

    /// The node the step acts on.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::Render { node, .. } | Self::Mount { node, .. } | Self::Unmount { node } => {
                Some(node)
            }
            Self::Lookup { from, .. } => from.as_deref(),
            Self::Settle | Self::Snapshot | Self::Clean => None,
        }
    }
}

/// A parsed scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Bindings by name.
    #[serde(default)]
    pub bindings: FxHashMap<String, BindingSpec>,

    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parses a scenario from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a scenario file.
    pub fn load(path: &Utf8Path) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
