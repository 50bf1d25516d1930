//! Mutable strategy graph.
//!
//! Nodes and connections live in a [`StableDiGraph`]; a side map resolves
//! the crate's stable [`NodeId`]s (never reused, unlike graph indices) to
//! petgraph indices. Connection edits enforce the socket discipline: one
//! consumer per input slot, one producer per output slot, identical socket
//! kinds, no self-loops.

use std::sync::Arc;

use petgraph::stable_graph::{EdgeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde_json::Value;
use tracing::debug;

use crate::error::{FlowError, FlowResult};

use super::catalog::NodeCatalog;
use super::types::{Connection, FlowNode, NodeId, NodeIndexMap, SocketType};

pub struct StrategyGraph {
    graph: StableDiGraph<FlowNode, Connection>,
    node_index_map: NodeIndexMap,
    catalog: Arc<NodeCatalog>,
    next_id: u64,
    last_added: Option<NodeId>,
    /// Whether newly created nodes are opportunistically wired to the
    /// previously created node.
    pub auto_connect: bool,
}

impl StrategyGraph {
    pub fn new(catalog: Arc<NodeCatalog>) -> Self {
        StrategyGraph {
            graph: StableDiGraph::new(),
            node_index_map: NodeIndexMap::new(),
            catalog,
            next_id: 1,
            last_added: None,
            auto_connect: true,
        }
    }

    pub fn catalog(&self) -> &Arc<NodeCatalog> {
        &self.catalog
    }

    /// Create a node of the given type at the canvas origin.
    pub fn add_node(&mut self, node_type: &str) -> FlowResult<NodeId> {
        self.add_node_at(node_type, 0.0, 0.0)
    }

    /// Create a node of the given type, deriving sockets and default params
    /// from the catalog, then apply the auto-connect heuristic.
    pub fn add_node_at(&mut self, node_type: &str, x: f64, y: f64) -> FlowResult<NodeId> {
        let spec = self
            .catalog
            .get(node_type)
            .ok_or_else(|| FlowError::UnknownNodeType(node_type.to_string()))?;

        let id = NodeId(self.next_id);
        self.next_id += 1;

        let node = FlowNode {
            id,
            node_type: spec.node_type.clone(),
            params: spec.default_params.clone(),
            inputs: spec.inputs.clone(),
            outputs: spec.outputs.clone(),
            x,
            y,
            last_result: None,
            last_execution_time: None,
            cached_output: None,
        };

        let idx = self.graph.add_node(node);
        self.node_index_map.insert(id, idx);

        let previous = self.last_added.replace(id);
        if self.auto_connect {
            if let Some(prev) = previous {
                self.apply_auto_connect(prev, id);
            }
        }

        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&FlowNode> {
        self.node_index_map
            .get(&id)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut FlowNode> {
        let idx = *self.node_index_map.get(&id)?;
        self.graph.node_weight_mut(idx)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> {
        self.graph.node_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn set_param(&mut self, id: NodeId, key: &str, value: Value) -> FlowResult<()> {
        let node = self.node_mut(id).ok_or(FlowError::NodeNotFound(id))?;
        node.params.insert(key.to_string(), value);
        Ok(())
    }

    /// Connect `(from, from_output)` to `(to, to_input)`.
    ///
    /// Returns whether the requested connection exists after the call.
    /// Malformed requests (unknown node, out-of-range index, socket kind
    /// mismatch, self-loop) are refused without error. A conflicting edge
    /// into the target input or out of the source output is silently
    /// replaced. Cycles are not prevented; a cyclic wiring re-fires until a
    /// handler halts the branch.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_output: usize,
        to: NodeId,
        to_input: usize,
    ) -> bool {
        if from == to {
            debug!(%from, "refusing self-loop connection");
            return false;
        }
        let (Some(&from_idx), Some(&to_idx)) =
            (self.node_index_map.get(&from), self.node_index_map.get(&to))
        else {
            debug!(%from, %to, "refusing connection with unknown endpoint");
            return false;
        };

        let out_kind = self
            .graph
            .node_weight(from_idx)
            .and_then(|n| n.outputs.get(from_output).copied());
        let in_kind = self
            .graph
            .node_weight(to_idx)
            .and_then(|n| n.inputs.get(to_input).copied());
        match (out_kind, in_kind) {
            (Some(a), Some(b)) if a == b => {}
            _ => {
                debug!(%from, from_output, %to, to_input, "refusing incompatible connection");
                return false;
            }
        }

        if self.find_edge(from, from_output, to, to_input).is_some() {
            return true;
        }

        // Single consumer per input slot, single producer per output slot.
        if let Some(edge) = self.edge_into(to, to_input) {
            self.graph.remove_edge(edge);
        }
        if let Some(edge) = self.edge_out_of(from, from_output) {
            self.graph.remove_edge(edge);
        }

        self.graph.add_edge(
            from_idx,
            to_idx,
            Connection {
                from,
                from_output,
                to,
                to_input,
            },
        );
        true
    }

    /// Remove the exact connection, if present.
    pub fn disconnect(
        &mut self,
        from: NodeId,
        from_output: usize,
        to: NodeId,
        to_input: usize,
    ) -> bool {
        match self.find_edge(from, from_output, to, to_input) {
            Some(edge) => {
                self.graph.remove_edge(edge);
                true
            }
            None => false,
        }
    }

    /// Delete a node and its incident connections, returning the removed
    /// state for undo snapshots.
    pub fn remove_node(&mut self, id: NodeId) -> Option<(FlowNode, Vec<Connection>)> {
        let idx = self.node_index_map.remove(&id)?;
        let connections = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| e.weight().clone())
            .collect();
        let node = self.graph.remove_node(idx)?;
        if self.last_added == Some(id) {
            self.last_added = None;
        }
        Some((node, connections))
    }

    /// Reinsert a previously deleted node under its original id and
    /// re-establish the given connections, skipping any whose other
    /// endpoint no longer exists. Does not count as a creation for the
    /// auto-connect heuristic.
    pub fn restore(&mut self, node: FlowNode, connections: &[Connection]) {
        let id = node.id;
        self.next_id = self.next_id.max(id.0 + 1);
        let idx = self.graph.add_node(node);
        self.node_index_map.insert(id, idx);
        for conn in connections {
            if !self.connect(conn.from, conn.from_output, conn.to, conn.to_input) {
                debug!(%conn.from, %conn.to, "skipping restored connection with missing endpoint");
            }
        }
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.graph.edge_weights().cloned().collect()
    }

    /// Successors reached through trigger-typed outputs, in output order.
    pub fn trigger_successors(&self, id: NodeId) -> Vec<Connection> {
        let mut out: Vec<Connection> = self
            .outgoing(id)
            .into_iter()
            .filter(|c| {
                self.node(id)
                    .and_then(|n| n.outputs.get(c.from_output))
                    .is_some_and(|s| *s == SocketType::Trigger)
            })
            .collect();
        out.sort_by_key(|c| c.from_output);
        out
    }

    /// Producers wired into this node's data inputs, in input order.
    pub fn data_sources(&self, id: NodeId) -> Vec<NodeId> {
        let mut edges: Vec<Connection> = self
            .incoming(id)
            .into_iter()
            .filter(|c| {
                self.node(id)
                    .and_then(|n| n.inputs.get(c.to_input))
                    .is_some_and(|s| *s == SocketType::Data)
            })
            .collect();
        edges.sort_by_key(|c| c.to_input);
        edges.into_iter().map(|c| c.from).collect()
    }

    pub fn outgoing(&self, id: NodeId) -> Vec<Connection> {
        let Some(&idx) = self.node_index_map.get(&id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight().clone())
            .collect()
    }

    pub fn incoming(&self, id: NodeId) -> Vec<Connection> {
        let Some(&idx) = self.node_index_map.get(&id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.weight().clone())
            .collect()
    }

    pub fn output_connected(&self, id: NodeId, output: usize) -> bool {
        self.edge_out_of(id, output).is_some()
    }

    pub fn input_connected(&self, id: NodeId, input: usize) -> bool {
        self.edge_into(id, input).is_some()
    }

    /// Record execution outcome on a node. Missing nodes (deleted
    /// mid-flight) are ignored.
    pub fn record_execution(&mut self, id: NodeId, result: bool, output: Option<String>) {
        if let Some(node) = self.node_mut(id) {
            node.last_result = Some(result);
            node.last_execution_time = Some(chrono::Utc::now());
            if let Some(data) = output {
                node.cached_output = Some(data);
            }
        }
    }

    /// Wire the first compatible unconnected trigger pair from `prev` to
    /// `new`, then the first compatible unconnected data pair. At most one
    /// connection per socket kind; existing connections are never displaced.
    fn apply_auto_connect(&mut self, prev: NodeId, new: NodeId) {
        for kind in [SocketType::Trigger, SocketType::Data] {
            if let Some((i, j)) = self.free_socket_pair(prev, new, kind) {
                self.connect(prev, i, new, j);
            }
        }
    }

    fn free_socket_pair(
        &self,
        prev: NodeId,
        new: NodeId,
        kind: SocketType,
    ) -> Option<(usize, usize)> {
        let prev_node = self.node(prev)?;
        let new_node = self.node(new)?;
        let out = prev_node
            .outputs
            .iter()
            .enumerate()
            .find(|(i, s)| **s == kind && !self.output_connected(prev, *i))
            .map(|(i, _)| i)?;
        let inp = new_node
            .inputs
            .iter()
            .enumerate()
            .find(|(j, s)| **s == kind && !self.input_connected(new, *j))
            .map(|(j, _)| j)?;
        Some((out, inp))
    }

    fn find_edge(
        &self,
        from: NodeId,
        from_output: usize,
        to: NodeId,
        to_input: usize,
    ) -> Option<EdgeIndex> {
        let &idx = self.node_index_map.get(&from)?;
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .find(|e| {
                let c = e.weight();
                c.to == to && c.to_input == to_input && c.from_output == from_output
            })
            .map(|e| e.id())
    }

    fn edge_into(&self, to: NodeId, to_input: usize) -> Option<EdgeIndex> {
        let &idx = self.node_index_map.get(&to)?;
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| e.weight().to_input == to_input)
            .map(|e| e.id())
    }

    fn edge_out_of(&self, from: NodeId, from_output: usize) -> Option<EdgeIndex> {
        let &idx = self.node_index_map.get(&from)?;
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .find(|e| e.weight().from_output == from_output)
            .map(|e| e.id())
    }

    /// Insert a node with an explicit id, used by schema import. Bumps the
    /// id counter past the imported id and resets creation history so the
    /// auto-connect heuristic never fires across an import boundary.
    pub(crate) fn insert_imported(&mut self, node: FlowNode) {
        let id = node.id;
        self.next_id = self.next_id.max(id.0 + 1);
        let idx = self.graph.add_node(node);
        self.node_index_map.insert(id, idx);
        self.last_added = None;
    }
}
