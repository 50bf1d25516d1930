//! Undoable node deletion.
//!
//! Deletion snapshots the node (identity, type, params, geometry) and every
//! incident connection before removing them, onto a bounded LIFO. Undo
//! replays the most recent snapshot, resolving connection endpoints by id
//! against the current node set; endpoints that no longer exist are
//! silently skipped. Only deletions are undoable.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::error::{FlowError, FlowResult};

use super::model::StrategyGraph;
use super::types::{Connection, FlowNode, NodeId};

/// Default number of deletions kept.
pub const DEFAULT_UNDO_DEPTH: usize = 20;

#[derive(Debug, Clone)]
struct DeletionRecord {
    node: FlowNode,
    connections: Vec<Connection>,
    #[allow(dead_code)]
    deleted_at: DateTime<Utc>,
}

pub struct UndoManager {
    stack: VecDeque<DeletionRecord>,
    depth: usize,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_UNDO_DEPTH)
    }

    pub fn with_depth(depth: usize) -> Self {
        UndoManager {
            stack: VecDeque::new(),
            depth,
        }
    }

    /// Snapshot and delete a node. The snapshot drops transient execution
    /// state; a restored node starts unexecuted.
    pub fn delete(&mut self, graph: &mut StrategyGraph, id: NodeId) -> FlowResult<()> {
        let (mut node, connections) = graph
            .remove_node(id)
            .ok_or(FlowError::NodeNotFound(id))?;
        node.last_result = None;
        node.last_execution_time = None;
        node.cached_output = None;

        if self.stack.len() == self.depth {
            self.stack.pop_front();
        }
        self.stack.push_back(DeletionRecord {
            node,
            connections,
            deleted_at: Utc::now(),
        });
        Ok(())
    }

    /// Restore the most recently deleted node, returning its id.
    pub fn undo(&mut self, graph: &mut StrategyGraph) -> FlowResult<NodeId> {
        let record = self.stack.pop_back().ok_or(FlowError::UndoEmpty)?;
        let id = record.node.id;
        graph.restore(record.node, &record.connections);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}
