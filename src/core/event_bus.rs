use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::graph::NodeId;

/// Engine events - a side-channel notification stream for observers (UI,
/// logs), never a control dependency.
#[derive(Clone, Debug, Serialize)]
pub enum FlowEvent {
    /// A trigger node fired, naming its immediate successors. The
    /// execution id distinguishes overlapping fire cycles in event logs.
    TriggerFired {
        node_id: NodeId,
        successors: Vec<NodeId>,
        execution_id: uuid::Uuid,
        timestamp: DateTime<Utc>,
    },

    NodeStarted {
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },

    NodeFinished {
        node_id: NodeId,
        result: bool,
        timestamp: DateTime<Utc>,
    },

    NodeFailed {
        node_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// User-visible status line posted by a handler or the engine.
    StatusMessage {
        node_id: Option<NodeId>,
        message: String,
        timestamp: DateTime<Utc>,
    },

    ScheduleStarted {
        node_id: NodeId,
        period_ms: u64,
        timestamp: DateTime<Utc>,
    },

    ScheduleStopped {
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },
}

pub type EventSender = mpsc::UnboundedSender<FlowEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<FlowEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Sender wrapper with an atomic active flag so that event emission can be
/// cheaply skipped when no listener is attached.
#[derive(Clone)]
pub struct EventEmitter {
    tx: EventSender,
    active: Arc<AtomicBool>,
}

impl EventEmitter {
    pub fn new(tx: EventSender) -> Self {
        Self {
            tx,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn emit(&self, event: FlowEvent) {
        if self.is_active() {
            let _ = self.tx.send(event);
        }
    }
}
