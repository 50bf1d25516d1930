//! Serializable strategy document.
//!
//! Export → import reproduces an isomorphic graph: same node set by
//! id/type/params, same connection set. Geometry is preserved for layout
//! only. Connections that fail validation on import (missing endpoint,
//! socket mismatch) are dropped with a warning rather than failing the
//! whole document.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{FlowError, FlowResult};
use crate::graph::{FlowNode, NodeId, StrategyGraph};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSchema {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSchema {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "toInput")]
    pub to_input: usize,
    #[serde(rename = "fromOutput")]
    pub from_output: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySchema {
    pub nodes: Vec<NodeSchema>,
    pub connections: Vec<ConnectionSchema>,
}

/// Snapshot a graph into an interchange document.
pub fn export_strategy(graph: &StrategyGraph) -> StrategySchema {
    let mut nodes: Vec<NodeSchema> = graph
        .nodes()
        .map(|n| NodeSchema {
            id: n.id,
            node_type: n.node_type.clone(),
            x: n.x,
            y: n.y,
            params: n.params.clone(),
        })
        .collect();
    nodes.sort_by_key(|n| n.id);

    let connections = graph
        .connections()
        .into_iter()
        .map(|c| ConnectionSchema {
            from: c.from,
            to: c.to,
            to_input: c.to_input,
            from_output: c.from_output,
        })
        .collect();

    StrategySchema { nodes, connections }
}

/// Rebuild a graph from an interchange document.
///
/// Node types must exist in the target graph's catalog; socket signatures
/// come from the catalog, not the document. Duplicate node ids are a schema
/// error; bad connections are dropped.
pub fn import_strategy(graph: &mut StrategyGraph, schema: &StrategySchema) -> FlowResult<()> {
    for node in &schema.nodes {
        if graph.node(node.id).is_some() {
            return Err(FlowError::SchemaError(format!(
                "duplicate node id {}",
                node.id
            )));
        }
        let spec = graph
            .catalog()
            .get(&node.node_type)
            .ok_or_else(|| FlowError::UnknownNodeType(node.node_type.clone()))?
            .clone();

        graph.insert_imported(FlowNode {
            id: node.id,
            node_type: spec.node_type,
            params: node.params.clone(),
            inputs: spec.inputs,
            outputs: spec.outputs,
            x: node.x,
            y: node.y,
            last_result: None,
            last_execution_time: None,
            cached_output: None,
        });
    }

    for conn in &schema.connections {
        if !graph.connect(conn.from, conn.from_output, conn.to, conn.to_input) {
            warn!(%conn.from, %conn.to, "dropping invalid connection from imported strategy");
        }
    }
    Ok(())
}

/// Period unit for a trigger node's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Seconds,
    Minutes,
    Hours,
}

/// Periodic re-fire configuration carried in a trigger node's params.
///
/// Must be validated (via [`period`](Self::period)) before being handed to
/// the scheduler; the scheduler assumes a valid positive period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub interval: f64,
    pub unit: PeriodUnit,
}

fn default_enabled() -> bool {
    true
}

impl PeriodicConfig {
    pub fn from_params(params: &Map<String, Value>) -> FlowResult<Self> {
        serde_json::from_value(Value::Object(params.clone()))
            .map_err(|e| FlowError::InvalidSchedule(e.to_string()))
    }

    /// Millisecond period, rejecting non-positive or non-finite intervals.
    pub fn period(&self) -> FlowResult<Duration> {
        if !self.interval.is_finite() || self.interval <= 0.0 {
            return Err(FlowError::InvalidSchedule(format!(
                "interval must be positive, got {}",
                self.interval
            )));
        }
        let unit_ms: f64 = match self.unit {
            PeriodUnit::Seconds => 1_000.0,
            PeriodUnit::Minutes => 60_000.0,
            PeriodUnit::Hours => 3_600_000.0,
        };
        Ok(Duration::from_millis((self.interval * unit_ms) as u64))
    }
}
