use chrono::{DateTime, Utc};
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque node identity. Stable for the node's lifetime and never reused,
/// including across delete/undo cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Socket kind. Connections are legal only between identical kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketType {
    /// Boolean "flow happened" signal; drives execution.
    #[serde(rename = "trigger")]
    Trigger,
    /// Textual/JSON payload produced by a node; read by consumers, never
    /// drives execution.
    #[serde(rename = "string")]
    Data,
}

/// A node in the strategy graph.
///
/// `inputs`/`outputs` are fixed by `node_type` via the catalog; socket
/// order encodes socket identity.
#[derive(Debug, Clone)]
pub struct FlowNode {
    pub id: NodeId,
    pub node_type: String,
    /// Handler-owned configuration.
    pub params: Map<String, Value>,
    pub inputs: Vec<SocketType>,
    pub outputs: Vec<SocketType>,
    /// Canvas position, layout only.
    pub x: f64,
    pub y: f64,
    /// Outcome of the most recent execution, if any.
    pub last_result: Option<bool>,
    pub last_execution_time: Option<DateTime<Utc>>,
    /// Data payload produced by the most recent execution (quote JSON, LLM
    /// reply, scraped body, ...). Exposed to consumers wired into this
    /// node's data output.
    pub cached_output: Option<String>,
}

impl FlowNode {
    /// `params.enabled != false` — absent counts as enabled.
    pub fn is_enabled(&self) -> bool {
        !matches!(self.params.get("enabled"), Some(Value::Bool(false)))
    }
}

/// Directed edge between two sockets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub from: NodeId,
    pub from_output: usize,
    pub to: NodeId,
    pub to_input: usize,
}

/// Node ID to petgraph NodeIndex mapping.
pub type NodeIndexMap = std::collections::HashMap<NodeId, NodeIndex>;
