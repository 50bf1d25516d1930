pub mod context;
pub mod dispatcher;
pub mod event_bus;
pub mod gate;

pub use context::{
    AlertChannel, AlertSender, CancellationToken, Capabilities, CloseRequest, LlmClient,
    MarketData, OrderGateway, OrderRequest, OrderSide, RuntimeContext, ScriptRunner, ServiceReply,
    WebScraper,
};
pub use dispatcher::{EngineConfig, FlowEngine, FlowEngineBuilder};
pub use event_bus::{create_event_channel, EventEmitter, EventReceiver, EventSender, FlowEvent};
pub use gate::{GateSynchronizer, DEFAULT_GATE_WINDOW};
