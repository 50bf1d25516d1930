//! Node type catalog.
//!
//! Maps a node type tag to its fixed socket signature, default parameters
//! and (for logic gates) the gate kind the engine synchronizes on. Creating
//! a node consults the catalog; adding a node type means registering a spec
//! here and a handler in the
//! [`NodeHandlerRegistry`](crate::nodes::NodeHandlerRegistry).

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use super::types::SocketType;

/// Multi-input synchronizing node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Or,
}

/// Fixed signature of a node type.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub node_type: String,
    pub inputs: Vec<SocketType>,
    pub outputs: Vec<SocketType>,
    pub default_params: Map<String, Value>,
    /// `Some` for nodes resolved by the gate synchronizer instead of a handler.
    pub gate: Option<GateKind>,
}

/// Registry of node type specs.
pub struct NodeCatalog {
    specs: HashMap<String, NodeSpec>,
}

use SocketType::{Data, Trigger};

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl NodeCatalog {
    /// Catalog with the built-in node types registered.
    pub fn new() -> Self {
        let mut catalog = NodeCatalog {
            specs: HashMap::new(),
        };
        catalog.register(NodeSpec {
            node_type: "trigger".into(),
            inputs: vec![],
            outputs: vec![Trigger],
            default_params: params(json!({
                "enabled": true,
                "interval": 1,
                "unit": "minutes",
            })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "price-check".into(),
            inputs: vec![Trigger],
            outputs: vec![Trigger, Data],
            default_params: params(json!({ "symbol": "EURUSD" })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "conditional".into(),
            inputs: vec![Trigger, Data],
            outputs: vec![Trigger],
            default_params: params(json!({ "operator": "gt", "value": 0.0 })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "buy-order".into(),
            inputs: vec![Trigger],
            outputs: vec![Trigger],
            default_params: params(json!({ "symbol": "EURUSD", "volume": 0.01 })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "sell-order".into(),
            inputs: vec![Trigger],
            outputs: vec![Trigger],
            default_params: params(json!({ "symbol": "EURUSD", "volume": 0.01 })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "close-position".into(),
            inputs: vec![Trigger],
            outputs: vec![Trigger],
            default_params: params(json!({ "symbol": "" })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "alert".into(),
            inputs: vec![Trigger, Data],
            outputs: vec![Trigger],
            default_params: params(json!({
                "channel": "sms",
                "to": "",
                "message": "",
            })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "llm".into(),
            inputs: vec![Trigger, Data],
            outputs: vec![Trigger, Data],
            default_params: params(json!({
                "model": "openai/gpt-3.5-turbo",
                "prompt": "",
            })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "script".into(),
            inputs: vec![Trigger],
            outputs: vec![Trigger, Data],
            default_params: params(json!({ "script": "", "args": [] })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "web-scrape".into(),
            inputs: vec![Trigger],
            outputs: vec![Trigger, Data],
            default_params: params(json!({ "url": "" })),
            gate: None,
        });
        catalog.register(NodeSpec {
            node_type: "and-gate".into(),
            inputs: vec![Trigger, Trigger],
            outputs: vec![Trigger],
            default_params: Map::new(),
            gate: Some(GateKind::And),
        });
        catalog.register(NodeSpec {
            node_type: "or-gate".into(),
            inputs: vec![Trigger, Trigger],
            outputs: vec![Trigger],
            default_params: Map::new(),
            gate: Some(GateKind::Or),
        });
        catalog.register(NodeSpec {
            node_type: "end".into(),
            inputs: vec![Trigger],
            outputs: vec![],
            default_params: Map::new(),
            gate: None,
        });
        catalog
    }

    pub fn register(&mut self, spec: NodeSpec) {
        self.specs.insert(spec.node_type.clone(), spec);
    }

    pub fn get(&self, node_type: &str) -> Option<&NodeSpec> {
        self.specs.get(node_type)
    }

    /// Gate kind for a node type, if it is a synchronizing type.
    pub fn gate_kind(&self, node_type: &str) -> Option<GateKind> {
        self.specs.get(node_type).and_then(|s| s.gate)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}

impl Default for NodeCatalog {
    fn default() -> Self {
        Self::new()
    }
}
