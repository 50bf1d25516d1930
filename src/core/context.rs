//! Capability context injected into node handlers.
//!
//! Every external collaborator (market data terminal, order gateway, alert
//! service, LLM endpoint, script host, scraper) is reached through a trait
//! object here; the engine and the handlers never talk to a concrete
//! service. All capability calls are async and return a [`ServiceReply`]
//! envelope: a failed external action is a normal strategy outcome, not an
//! error path.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::event_bus::{EventEmitter, FlowEvent};
use crate::graph::{NodeId, StrategyGraph};

/// `{success, data | error}` envelope returned by every capability call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceReply {
    pub fn ok(data: Value) -> Self {
        ServiceReply {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        ServiceReply {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        ServiceReply {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Payload as a string: strings verbatim, other JSON compact-encoded.
    pub fn data_string(&self) -> Option<String> {
        match &self.data {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertChannel {
    Sms,
    Whatsapp,
}

/// Market data terminal: quotes and symbol listings.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn quote(&self, symbol: &str) -> ServiceReply;
    async fn symbols(&self, filter: Option<&str>) -> ServiceReply;
}

/// Order execution gateway.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn place(&self, order: &OrderRequest) -> ServiceReply;
    async fn close(&self, request: &CloseRequest) -> ServiceReply;
}

/// SMS / WhatsApp alert delivery.
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, channel: AlertChannel, to: &str, message: &str) -> ServiceReply;
}

/// Chat-completion endpoint.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> ServiceReply;
}

/// External script host.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, script: &str, args: &[String]) -> ServiceReply;
}

/// Web page fetcher.
#[async_trait]
pub trait WebScraper: Send + Sync {
    async fn fetch(&self, url: &str) -> ServiceReply;
}

/// The injected capability set. Unset capabilities answer with a
/// "not connected" error envelope, mirroring a disconnected terminal.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub market: Option<Arc<dyn MarketData>>,
    pub orders: Option<Arc<dyn OrderGateway>>,
    pub alerts: Option<Arc<dyn AlertSender>>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub scripts: Option<Arc<dyn ScriptRunner>>,
    pub scraper: Option<Arc<dyn WebScraper>>,
}

impl Capabilities {
    pub fn with_market(mut self, market: Arc<dyn MarketData>) -> Self {
        self.market = Some(market);
        self
    }

    pub fn with_orders(mut self, orders: Arc<dyn OrderGateway>) -> Self {
        self.orders = Some(orders);
        self
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertSender>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptRunner>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn with_scraper(mut self, scraper: Arc<dyn WebScraper>) -> Self {
        self.scraper = Some(scraper);
        self
    }
}

/// Cooperative stop flag, observed by handlers at their own decision
/// points. Tripping it never interrupts an in-flight handler.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Re-arm after a stop, before starting a fresh run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
    }
}

/// Everything a node handler may touch besides its own node.
#[derive(Clone)]
pub struct RuntimeContext {
    capabilities: Capabilities,
    events: EventEmitter,
    cancel: CancellationToken,
    graph: Arc<RwLock<StrategyGraph>>,
}

impl RuntimeContext {
    pub fn new(
        capabilities: Capabilities,
        events: EventEmitter,
        cancel: CancellationToken,
        graph: Arc<RwLock<StrategyGraph>>,
    ) -> Self {
        RuntimeContext {
            capabilities,
            events,
            cancel,
            graph,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cached outputs of the data-producing nodes wired into this node's
    /// data inputs, in input order. Producers that have not executed yet
    /// contribute nothing.
    pub fn upstream_data(&self, node: NodeId) -> Vec<String> {
        let graph = self.graph.read();
        graph
            .data_sources(node)
            .into_iter()
            .filter_map(|src| graph.node(src).and_then(|n| n.cached_output.clone()))
            .collect()
    }

    /// Post a user-visible status line.
    pub fn post_status(&self, node: Option<NodeId>, message: impl Into<String>) {
        self.events.emit(FlowEvent::StatusMessage {
            node_id: node,
            message: message.into(),
            timestamp: chrono::Utc::now(),
        });
    }

    pub async fn quote(&self, symbol: &str) -> ServiceReply {
        match &self.capabilities.market {
            Some(market) => market.quote(symbol).await,
            None => ServiceReply::err("market data not connected"),
        }
    }

    pub async fn symbols(&self, filter: Option<&str>) -> ServiceReply {
        match &self.capabilities.market {
            Some(market) => market.symbols(filter).await,
            None => ServiceReply::err("market data not connected"),
        }
    }

    pub async fn place_order(&self, order: &OrderRequest) -> ServiceReply {
        match &self.capabilities.orders {
            Some(gateway) => gateway.place(order).await,
            None => ServiceReply::err("order gateway not connected"),
        }
    }

    pub async fn close_position(&self, request: &CloseRequest) -> ServiceReply {
        match &self.capabilities.orders {
            Some(gateway) => gateway.close(request).await,
            None => ServiceReply::err("order gateway not connected"),
        }
    }

    pub async fn send_alert(&self, channel: AlertChannel, to: &str, message: &str) -> ServiceReply {
        match &self.capabilities.alerts {
            Some(alerts) => alerts.send(channel, to, message).await,
            None => ServiceReply::err("alert service not configured"),
        }
    }

    pub async fn complete(&self, model: &str, prompt: &str) -> ServiceReply {
        match &self.capabilities.llm {
            Some(llm) => llm.complete(model, prompt).await,
            None => ServiceReply::err("LLM endpoint not configured"),
        }
    }

    pub async fn run_script(&self, script: &str, args: &[String]) -> ServiceReply {
        match &self.capabilities.scripts {
            Some(runner) => runner.run(script, args).await,
            None => ServiceReply::err("script host not configured"),
        }
    }

    pub async fn fetch_url(&self, url: &str) -> ServiceReply {
        match &self.capabilities.scraper {
            Some(scraper) => scraper.fetch(url).await,
            None => ServiceReply::err("scraper not configured"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::create_event_channel;
    use crate::graph::NodeCatalog;

    fn context() -> (RuntimeContext, crate::core::event_bus::EventReceiver) {
        let (tx, rx) = create_event_channel();
        let graph = Arc::new(RwLock::new(StrategyGraph::new(Arc::new(
            NodeCatalog::new(),
        ))));
        let ctx = RuntimeContext::new(
            Capabilities::default(),
            EventEmitter::new(tx),
            CancellationToken::new(),
            graph,
        );
        (ctx, rx)
    }

    #[tokio::test]
    async fn unset_capability_answers_not_connected() {
        let (ctx, _rx) = context();
        let reply = ctx.quote("EURUSD").await;
        assert!(!reply.success);
        assert!(reply.error.unwrap().contains("not connected"));
    }

    #[tokio::test]
    async fn status_messages_reach_the_bus() {
        let (ctx, mut rx) = context();
        ctx.post_status(None, "hello");
        match rx.recv().await.unwrap() {
            FlowEvent::StatusMessage { message, .. } => assert_eq!(message, "hello"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn cancellation_token_round_trip() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn reply_data_string() {
        assert_eq!(
            ServiceReply::ok(Value::String("x".into())).data_string(),
            Some("x".into())
        );
        assert_eq!(
            ServiceReply::ok(serde_json::json!({"bid": 1.1})).data_string(),
            Some("{\"bid\":1.1}".into())
        );
        assert_eq!(ServiceReply::err("e").data_string(), None);
    }
}
