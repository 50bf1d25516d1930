//! Flow engine — the execution driver.
//!
//! [`FlowEngine`] walks the strategy graph from a fired trigger, executing
//! each node via its registered [`NodeHandler`](crate::nodes::NodeHandler),
//! threading results through the gate synchronizer for AND/OR nodes,
//! short-circuiting branches whose handler halted, and fanning out to
//! trigger-typed successors concurrently.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::core::context::{Capabilities, CancellationToken, RuntimeContext};
use crate::core::event_bus::{create_event_channel, EventEmitter, EventReceiver, FlowEvent};
use crate::core::gate::GateSynchronizer;
use crate::error::{FlowError, FlowResult};
use crate::graph::{NodeId, StrategyGraph};
use crate::nodes::NodeHandlerRegistry;

/// Engine tuning knobs.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    /// Pause before each successor kicked off by `fire`. Cosmetic
    /// rate-limiting; zero disables it.
    pub pacing_delay_ms: u64,
    /// How long a gate holds a partial input set before treating it as
    /// stale. Does not scale with handler latency; raise it for strategies
    /// with slow branches feeding a gate.
    pub gate_window_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pacing_delay_ms: 150,
            gate_window_ms: 100,
        }
    }
}

pub struct FlowEngine {
    graph: Arc<RwLock<StrategyGraph>>,
    handlers: Arc<NodeHandlerRegistry>,
    context: RuntimeContext,
    gates: GateSynchronizer,
    events: EventEmitter,
    config: EngineConfig,
}

impl FlowEngine {
    pub fn builder(graph: Arc<RwLock<StrategyGraph>>) -> FlowEngineBuilder {
        FlowEngineBuilder {
            graph,
            capabilities: Capabilities::default(),
            handlers: None,
            config: EngineConfig::default(),
        }
    }

    pub fn graph(&self) -> &Arc<RwLock<StrategyGraph>> {
        &self.graph
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    pub fn cancellation(&self) -> &CancellationToken {
        self.context.cancellation()
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.events
    }

    /// Fire a trigger node.
    ///
    /// Silent no-op when the trigger is disabled. Clears gate state from
    /// any earlier fire, then kicks off each trigger-typed successor
    /// sequentially with a pacing delay, awaiting every resulting branch
    /// before returning.
    pub async fn fire(&self, trigger: NodeId) -> FlowResult<()> {
        let (enabled, successors) = {
            let graph = self.graph.read();
            let node = graph.node(trigger).ok_or(FlowError::NodeNotFound(trigger))?;
            (node.is_enabled(), graph.trigger_successors(trigger))
        };
        if !enabled {
            debug!(%trigger, "trigger disabled, ignoring fire");
            return Ok(());
        }

        self.gates.clear();
        self.events.emit(FlowEvent::TriggerFired {
            node_id: trigger,
            successors: successors.iter().map(|c| c.to).collect(),
            execution_id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        });

        for conn in successors {
            if self.config.pacing_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.pacing_delay_ms)).await;
            }
            self.run_node(conn.to, conn.to_input, true).await;
        }
        Ok(())
    }

    /// Execute one node and everything downstream of it.
    ///
    /// Returns `None` when the node is a gate still waiting for its other
    /// inputs; that path must not advance. Otherwise returns the node's
    /// result after every downstream branch it opened has finished.
    pub fn run_node(
        &self,
        id: NodeId,
        input_index: usize,
        input: bool,
    ) -> BoxFuture<'_, Option<bool>> {
        Box::pin(async move {
            let (node, gate) = {
                let graph = self.graph.read();
                match graph.node(id) {
                    Some(n) => (n.clone(), graph.catalog().gate_kind(&n.node_type)),
                    None => {
                        warn!(%id, "node vanished before execution");
                        return Some(false);
                    }
                }
            };

            let result;
            let mut output = None;

            if let Some(kind) = gate {
                match self
                    .gates
                    .submit(id, kind, node.inputs.len(), input_index, input)
                {
                    None => return None,
                    Some(resolved) => result = resolved,
                }
            } else {
                self.events.emit(FlowEvent::NodeStarted {
                    node_id: id,
                    timestamp: chrono::Utc::now(),
                });
                match self.handlers.get(&node.node_type) {
                    Some(handler) => match handler.execute(&node, input, &self.context).await {
                        Ok(outcome) => {
                            result = outcome.proceed;
                            output = outcome.output;
                        }
                        Err(err) => {
                            // A failing handler halts its own branch only;
                            // siblings and the surrounding fire continue.
                            result = false;
                            self.events.emit(FlowEvent::NodeFailed {
                                node_id: id,
                                error: err.to_string(),
                                timestamp: chrono::Utc::now(),
                            });
                            self.context
                                .post_status(Some(id), format!("{} failed: {err}", node.node_type));
                        }
                    },
                    None => {
                        warn!(%id, node_type = %node.node_type, "no handler registered");
                        result = false;
                        self.events.emit(FlowEvent::NodeFailed {
                            node_id: id,
                            error: format!("no handler for type {}", node.node_type),
                            timestamp: chrono::Utc::now(),
                        });
                    }
                }
            }

            self.graph.write().record_execution(id, result, output);
            self.events.emit(FlowEvent::NodeFinished {
                node_id: id,
                result,
                timestamp: chrono::Utc::now(),
            });

            if !result {
                return Some(false);
            }

            // Concurrent fan-out: all branch futures are created before any
            // is polled, then joined. Completion order is unspecified.
            let successors = self.graph.read().trigger_successors(id);
            let branches: Vec<_> = successors
                .into_iter()
                .map(|conn| self.run_node(conn.to, conn.to_input, result))
                .collect();
            join_all(branches).await;

            Some(result)
        })
    }
}

pub struct FlowEngineBuilder {
    graph: Arc<RwLock<StrategyGraph>>,
    capabilities: Capabilities,
    handlers: Option<NodeHandlerRegistry>,
    config: EngineConfig,
}

impl FlowEngineBuilder {
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Replace the built-in handler registry.
    pub fn handlers(mut self, handlers: NodeHandlerRegistry) -> Self {
        self.handlers = Some(handlers);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> (FlowEngine, EventReceiver) {
        let (tx, rx) = create_event_channel();
        let events = EventEmitter::new(tx);
        let cancel = CancellationToken::new();
        let context = RuntimeContext::new(
            self.capabilities,
            events.clone(),
            cancel,
            self.graph.clone(),
        );
        let engine = FlowEngine {
            graph: self.graph,
            handlers: Arc::new(self.handlers.unwrap_or_default()),
            context,
            gates: GateSynchronizer::new(Duration::from_millis(self.config.gate_window_ms)),
            events,
            config: self.config,
        };
        (engine, rx)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Map;

    use crate::error::NodeError;
    use crate::graph::{FlowNode, NodeCatalog, NodeSpec, SocketType};
    use crate::nodes::{HandlerOutcome, NodeHandler};

    use super::*;

    /// Records invocations; proceeds or halts per its fixed result.
    struct SpyHandler {
        calls: Arc<Mutex<Vec<NodeId>>>,
        result: bool,
    }

    #[async_trait]
    impl NodeHandler for SpyHandler {
        async fn execute(
            &self,
            node: &FlowNode,
            _input: bool,
            _ctx: &RuntimeContext,
        ) -> Result<HandlerOutcome, NodeError> {
            self.calls.lock().push(node.id);
            Ok(HandlerOutcome {
                proceed: self.result,
                output: None,
            })
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl NodeHandler for FailingHandler {
        async fn execute(
            &self,
            _node: &FlowNode,
            _input: bool,
            _ctx: &RuntimeContext,
        ) -> Result<HandlerOutcome, NodeError> {
            Err(NodeError::CapabilityError("boom".into()))
        }
    }

    fn test_catalog() -> NodeCatalog {
        let mut catalog = NodeCatalog::new();
        for ty in ["pass", "halt", "fail"] {
            catalog.register(NodeSpec {
                node_type: ty.into(),
                inputs: vec![SocketType::Trigger],
                outputs: vec![SocketType::Trigger],
                default_params: Map::new(),
                gate: None,
            });
        }
        // two trigger outputs, for fan-out across sockets
        catalog.register(NodeSpec {
            node_type: "split".into(),
            inputs: vec![SocketType::Trigger],
            outputs: vec![SocketType::Trigger, SocketType::Trigger],
            default_params: Map::new(),
            gate: None,
        });
        catalog
    }

    fn engine_with_spies() -> (FlowEngine, EventReceiver, Arc<Mutex<Vec<NodeId>>>) {
        let mut graph = StrategyGraph::new(Arc::new(test_catalog()));
        graph.auto_connect = false;
        let graph = Arc::new(RwLock::new(graph));

        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = NodeHandlerRegistry::empty();
        handlers.register(
            "pass",
            Box::new(SpyHandler {
                calls: calls.clone(),
                result: true,
            }),
        );
        handlers.register(
            "halt",
            Box::new(SpyHandler {
                calls: calls.clone(),
                result: false,
            }),
        );
        handlers.register("fail", Box::new(FailingHandler));
        handlers.register(
            "split",
            Box::new(SpyHandler {
                calls: calls.clone(),
                result: true,
            }),
        );

        let (engine, rx) = FlowEngine::builder(graph)
            .handlers(handlers)
            .config(EngineConfig {
                pacing_delay_ms: 0,
                gate_window_ms: 100,
            })
            .build();
        (engine, rx, calls)
    }

    #[tokio::test]
    async fn fire_walks_the_chain() {
        let (engine, _rx, calls) = engine_with_spies();
        let (t, a, b) = {
            let mut g = engine.graph().write();
            let t = g.add_node("trigger").unwrap();
            let a = g.add_node("pass").unwrap();
            let b = g.add_node("pass").unwrap();
            g.connect(t, 0, a, 0);
            g.connect(a, 0, b, 0);
            (t, a, b)
        };
        engine.fire(t).await.unwrap();
        assert_eq!(*calls.lock(), vec![a, b]);

        let g = engine.graph().read();
        assert_eq!(g.node(a).unwrap().last_result, Some(true));
        assert!(g.node(a).unwrap().last_execution_time.is_some());
    }

    #[tokio::test]
    async fn disabled_trigger_is_a_silent_noop() {
        let (engine, _rx, calls) = engine_with_spies();
        let t = {
            let mut g = engine.graph().write();
            let t = g.add_node("trigger").unwrap();
            let a = g.add_node("pass").unwrap();
            g.connect(t, 0, a, 0);
            g.set_param(t, "enabled", serde_json::json!(false)).unwrap();
            t
        };
        engine.fire(t).await.unwrap();
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn halting_handler_short_circuits() {
        let (engine, _rx, calls) = engine_with_spies();
        let (t, a) = {
            let mut g = engine.graph().write();
            let t = g.add_node("trigger").unwrap();
            let a = g.add_node("halt").unwrap();
            let b = g.add_node("pass").unwrap();
            g.connect(t, 0, a, 0);
            g.connect(a, 0, b, 0);
            (t, a)
        };
        engine.fire(t).await.unwrap();
        assert_eq!(*calls.lock(), vec![a], "successor of a halted node ran");
        assert_eq!(
            engine.graph().read().node(a).unwrap().last_result,
            Some(false)
        );
    }

    #[tokio::test]
    async fn handler_error_halts_branch_but_not_siblings() {
        let (engine, mut rx, calls) = engine_with_spies();
        let (t, split, ok) = {
            let mut g = engine.graph().write();
            let t = g.add_node("trigger").unwrap();
            let split = g.add_node("split").unwrap();
            let bad = g.add_node("fail").unwrap();
            let ok = g.add_node("pass").unwrap();
            g.connect(t, 0, split, 0);
            g.connect(split, 0, bad, 0);
            g.connect(split, 1, ok, 0);
            (t, split, ok)
        };
        engine.fire(t).await.unwrap();
        // the failing sibling never stops the passing one
        assert_eq!(*calls.lock(), vec![split, ok]);

        let mut failed = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, FlowEvent::NodeFailed { .. }) {
                failed = true;
            }
        }
        assert!(failed);
    }

    #[tokio::test]
    async fn trigger_fired_event_names_successors() {
        let (engine, mut rx, _calls) = engine_with_spies();
        let (t, a) = {
            let mut g = engine.graph().write();
            let t = g.add_node("trigger").unwrap();
            let a = g.add_node("pass").unwrap();
            g.connect(t, 0, a, 0);
            (t, a)
        };
        engine.fire(t).await.unwrap();
        match rx.recv().await.unwrap() {
            FlowEvent::TriggerFired {
                node_id,
                successors,
                ..
            } => {
                assert_eq!(node_id, t);
                assert_eq!(successors, vec![a]);
            }
            other => panic!("unexpected first event {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_trigger_is_an_error() {
        let (engine, _rx, _calls) = engine_with_spies();
        assert!(matches!(
            engine.fire(NodeId(99)).await,
            Err(FlowError::NodeNotFound(_))
        ));
    }
}
