//! AND/OR gate synchronization.
//!
//! Graph branches fire independently and with unequal latency, so a
//! multi-input gate cannot evaluate on first arrival. Arrivals are buffered
//! per gate node; an entry older than the synchronization window is treated
//! as stale and reset, so a straggler from an earlier fire never combines
//! with a fresh cycle. Entries are one-shot: resolving a gate deletes its
//! entry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::graph::{GateKind, NodeId};

/// Default synchronization window.
pub const DEFAULT_GATE_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct GateEntry {
    collected: Vec<Option<bool>>,
    first_arrival: Instant,
}

pub struct GateSynchronizer {
    entries: Mutex<HashMap<NodeId, GateEntry>>,
    window: Duration,
}

impl GateSynchronizer {
    pub fn new(window: Duration) -> Self {
        GateSynchronizer {
            entries: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Record an input arrival and resolve the gate if every slot is set.
    ///
    /// `width` is the gate's declared input count. Returns `None` while the
    /// gate is still waiting for the remaining inputs.
    pub fn submit(
        &self,
        gate: NodeId,
        kind: GateKind,
        width: usize,
        input_index: usize,
        value: bool,
    ) -> Option<bool> {
        if input_index >= width {
            warn!(%gate, input_index, width, "gate input index out of range");
            return None;
        }

        let mut entries = self.entries.lock();
        let entry = entries.entry(gate).or_insert_with(|| GateEntry {
            collected: vec![None; width],
            first_arrival: Instant::now(),
        });

        if entry.first_arrival.elapsed() > self.window {
            debug!(%gate, "gate window elapsed, starting a fresh cycle");
            *entry = GateEntry {
                collected: vec![None; width],
                first_arrival: Instant::now(),
            };
        }

        entry.collected[input_index] = Some(value);

        if entry.collected.iter().any(|slot| slot.is_none()) {
            return None;
        }

        // one-shot: the resolved entry never carries into a later cycle
        let result = match kind {
            GateKind::And => entry.collected.iter().all(|slot| *slot == Some(true)),
            GateKind::Or => entry.collected.iter().any(|slot| *slot == Some(true)),
        };
        entries.remove(&gate);
        Some(result)
    }

    /// Drop all collected state; called at the start of each trigger fire.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
