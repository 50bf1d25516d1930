//! # tradeflow — a node-graph strategy automation engine
//!
//! `tradeflow` lets a caller assemble a trading strategy as a directed
//! graph of typed nodes and execute it on demand or on a schedule. The
//! engine owns *when* and *in what order* node handlers run and how data
//! flows between them; what a node actually does (quotes, orders, alerts,
//! completions) lives behind injected capability traits.
//!
//! - **Typed sockets**: `trigger` (flow) and `string` (data) connectors;
//!   connections are legal only between identical kinds, with one producer
//!   per output slot and one consumer per input slot.
//! - **Trigger propagation**: firing a trigger walks the graph, awaiting
//!   each handler; a falsy result short-circuits that branch, a truthy one
//!   fans out concurrently across trigger outputs.
//! - **Logic gates**: AND/OR nodes buffer their inputs in a bounded time
//!   window and resolve once every input has arrived.
//! - **Scheduling**: a trigger's `{interval, unit}` config becomes a
//!   recurring re-fire; stop-all disables manual triggers and trips a
//!   cooperative cancellation flag.
//! - **Undoable edits**: node deletion snapshots the node and its incident
//!   connections onto a bounded stack and can be replayed exactly.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parking_lot::RwLock;
//! use tradeflow::{FlowEngine, NodeCatalog, StrategyGraph};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut graph = StrategyGraph::new(Arc::new(NodeCatalog::new()));
//!     let trigger = graph.add_node("trigger").unwrap();
//!     let check = graph.add_node("price-check").unwrap();
//!     graph.connect(trigger, 0, check, 0);
//!
//!     let (engine, mut events) = FlowEngine::builder(Arc::new(RwLock::new(graph))).build();
//!     engine.fire(trigger).await.unwrap();
//!     while let Ok(event) = events.try_recv() {
//!         println!("{event:?}");
//!     }
//! }
//! ```

pub mod core;
pub mod dsl;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod scheduler;

pub use crate::core::{
    AlertChannel, AlertSender, CancellationToken, Capabilities, CloseRequest, EngineConfig,
    EventReceiver, EventSender, FlowEngine, FlowEngineBuilder, FlowEvent, LlmClient, MarketData,
    OrderGateway, OrderRequest, OrderSide, RuntimeContext, ScriptRunner, ServiceReply, WebScraper,
};
pub use crate::dsl::{
    export_strategy, import_strategy, ConnectionSchema, NodeSchema, PeriodUnit, PeriodicConfig,
    StrategySchema,
};
pub use crate::error::{FlowError, FlowResult, NodeError, NodeResult};
pub use crate::graph::{
    Connection, FlowNode, GateKind, NodeCatalog, NodeId, NodeSpec, SocketType, StrategyGraph,
    UndoManager,
};
pub use crate::nodes::{HandlerOutcome, NodeHandler, NodeHandlerRegistry};
pub use crate::scheduler::Scheduler;
