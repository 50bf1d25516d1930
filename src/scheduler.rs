//! Periodic trigger scheduling.
//!
//! Turns a trigger node's validated `{interval, unit}` configuration into a
//! recurring task that re-fires the engine. One task per node; starting is
//! idempotent (any prior task for that node is cancelled first), stopping
//! forgets timing entirely, so a restart begins a fresh period from now.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::event_bus::FlowEvent;
use crate::core::FlowEngine;
use crate::dsl::PeriodicConfig;
use crate::error::{FlowError, FlowResult};
use crate::graph::NodeId;

pub struct Scheduler {
    engine: Arc<FlowEngine>,
    tasks: Mutex<HashMap<NodeId, JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(engine: Arc<FlowEngine>) -> Self {
        Scheduler {
            engine,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or restart) periodic firing of a trigger node, reading and
    /// validating the schedule from the node's params.
    pub fn start(&self, trigger: NodeId) -> FlowResult<()> {
        let config = {
            let graph = self.engine.graph().read();
            let node = graph.node(trigger).ok_or(FlowError::NodeNotFound(trigger))?;
            PeriodicConfig::from_params(&node.params)?
        };
        let period = config.period()?;
        self.start_with_period(trigger, period);
        Ok(())
    }

    /// Start (or restart) periodic firing with an already-validated period.
    pub fn start_with_period(&self, trigger: NodeId, period: Duration) {
        // a fresh run re-arms the cooperative stop flag
        self.engine.cancellation().reset();

        let engine = self.engine.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first tick of tokio's interval completes immediately; a
            // period trigger waits one full period before its first fire
            ticker.tick().await;
            loop {
                ticker.tick().await;
                // each fire runs detached: cancelling the schedule stops
                // future ticks, never an in-flight chain
                let engine = engine.clone();
                tokio::spawn(async move {
                    if let Err(err) = engine.fire(trigger).await {
                        warn!(%trigger, %err, "periodic fire failed");
                    }
                });
            }
        });

        let previous = self.tasks.lock().insert(trigger, handle);
        if let Some(old) = previous {
            debug!(%trigger, "replacing existing schedule");
            old.abort();
        }

        self.engine.emitter().emit(FlowEvent::ScheduleStarted {
            node_id: trigger,
            period_ms: period.as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Cancel the node's recurring task, if any.
    pub fn stop(&self, trigger: NodeId) -> bool {
        match self.tasks.lock().remove(&trigger) {
            Some(handle) => {
                handle.abort();
                self.engine.emitter().emit(FlowEvent::ScheduleStopped {
                    node_id: trigger,
                    timestamp: chrono::Utc::now(),
                });
                true
            }
            None => false,
        }
    }

    /// Stop the whole strategy: cancel every recurring task, disable manual
    /// triggers so future manual fires are no-ops, and trip the cooperative
    /// cancellation flag. In-flight handlers run to completion.
    pub fn stop_all(&self) {
        let stopped: Vec<NodeId> = {
            let mut tasks = self.tasks.lock();
            tasks
                .drain()
                .map(|(id, handle)| {
                    handle.abort();
                    id
                })
                .collect()
        };
        for id in stopped {
            self.engine.emitter().emit(FlowEvent::ScheduleStopped {
                node_id: id,
                timestamp: chrono::Utc::now(),
            });
        }

        {
            let mut graph = self.engine.graph().write();
            let triggers: Vec<NodeId> = graph
                .nodes()
                .filter(|n| n.node_type == "trigger")
                .map(|n| n.id)
                .collect();
            for id in triggers {
                let _ = graph.set_param(id, "enabled", serde_json::json!(false));
            }
        }

        self.engine.cancellation().cancel();
    }

    pub fn is_scheduled(&self, trigger: NodeId) -> bool {
        self.tasks.lock().contains_key(&trigger)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.lock().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::{Mutex as PlMutex, RwLock};
    use serde_json::{json, Map};

    use crate::core::{EngineConfig, RuntimeContext};
    use crate::error::NodeError;
    use crate::graph::{FlowNode, NodeCatalog, NodeSpec, SocketType, StrategyGraph};
    use crate::nodes::{HandlerOutcome, NodeHandler, NodeHandlerRegistry};

    use super::*;

    struct CountingHandler {
        count: Arc<PlMutex<usize>>,
    }

    #[async_trait]
    impl NodeHandler for CountingHandler {
        async fn execute(
            &self,
            _node: &FlowNode,
            _input: bool,
            _ctx: &RuntimeContext,
        ) -> Result<HandlerOutcome, NodeError> {
            *self.count.lock() += 1;
            Ok(HandlerOutcome::proceed())
        }
    }

    fn fixture() -> (Arc<FlowEngine>, Scheduler, NodeId, Arc<PlMutex<usize>>) {
        let mut catalog = NodeCatalog::new();
        catalog.register(NodeSpec {
            node_type: "count".into(),
            inputs: vec![SocketType::Trigger],
            outputs: vec![SocketType::Trigger],
            default_params: Map::new(),
            gate: None,
        });
        let mut graph = StrategyGraph::new(Arc::new(catalog));
        graph.auto_connect = false;
        let t = graph.add_node("trigger").unwrap();
        let c = graph.add_node("count").unwrap();
        graph.connect(t, 0, c, 0);

        let count = Arc::new(PlMutex::new(0));
        let mut handlers = NodeHandlerRegistry::empty();
        handlers.register(
            "count",
            Box::new(CountingHandler {
                count: count.clone(),
            }),
        );

        let (engine, _rx) = FlowEngine::builder(Arc::new(RwLock::new(graph)))
            .handlers(handlers)
            .config(EngineConfig {
                pacing_delay_ms: 0,
                gate_window_ms: 100,
            })
            .build();
        let engine = Arc::new(engine);
        let scheduler = Scheduler::new(engine.clone());
        (engine, scheduler, t, count)
    }

    #[tokio::test]
    async fn periodic_fire_reaches_successors() {
        let (_engine, scheduler, t, count) = fixture();
        scheduler.start_with_period(t, Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(110)).await;
        scheduler.stop(t);
        let fired = *count.lock();
        assert!(fired >= 2, "expected repeated fires, got {fired}");
    }

    #[tokio::test]
    async fn start_is_idempotent_per_node() {
        let (_engine, scheduler, t, _count) = fixture();
        scheduler.start_with_period(t, Duration::from_millis(50));
        scheduler.start_with_period(t, Duration::from_millis(50));
        assert_eq!(scheduler.active_count(), 1);
        scheduler.stop(t);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test]
    async fn stop_without_schedule_reports_false() {
        let (_engine, scheduler, t, _count) = fixture();
        assert!(!scheduler.stop(t));
    }

    #[tokio::test]
    async fn start_validates_params() {
        let (engine, scheduler, t, _count) = fixture();
        engine
            .graph()
            .write()
            .set_param(t, "interval", json!(-5))
            .unwrap();
        assert!(matches!(
            scheduler.start(t),
            Err(FlowError::InvalidSchedule(_))
        ));
        assert!(!scheduler.is_scheduled(t));
    }

    #[tokio::test]
    async fn stop_all_disables_manual_triggers_and_cancels() {
        let (engine, scheduler, t, count) = fixture();
        scheduler.start_with_period(t, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(35)).await;
        scheduler.stop_all();
        assert_eq!(scheduler.active_count(), 0);
        assert!(engine.cancellation().is_cancelled());
        assert!(!engine.graph().read().node(t).unwrap().is_enabled());

        // let any fire spawned just before the stop drain out
        tokio::time::sleep(Duration::from_millis(30)).await;

        // a manual fire after stop-all is a silent no-op
        let before = *count.lock();
        engine.fire(t).await.unwrap();
        assert_eq!(*count.lock(), before);
    }
}
