//! Order execution handlers.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::context::{CloseRequest, OrderRequest, OrderSide, RuntimeContext};
use crate::error::NodeError;
use crate::graph::FlowNode;

use super::executor::{HandlerOutcome, NodeHandler};

#[derive(Debug, Deserialize)]
struct OrderConfig {
    symbol: String,
    volume: f64,
    #[serde(default)]
    stop_loss: Option<f64>,
    #[serde(default)]
    take_profit: Option<f64>,
}

/// Places a market order through the gateway. A rejected order halts the
/// branch; this is the normal way a strategy leg dies, not an engine error.
pub struct OrderHandler {
    side: OrderSide,
}

impl OrderHandler {
    pub fn buy() -> Self {
        OrderHandler {
            side: OrderSide::Buy,
        }
    }

    pub fn sell() -> Self {
        OrderHandler {
            side: OrderSide::Sell,
        }
    }
}

#[async_trait]
impl NodeHandler for OrderHandler {
    async fn execute(
        &self,
        node: &FlowNode,
        _input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError> {
        if ctx.cancellation().is_cancelled() {
            return Ok(HandlerOutcome::halt());
        }
        let config: OrderConfig = serde_json::from_value(Value::Object(node.params.clone()))
            .map_err(|e| NodeError::ConfigError(format!("invalid order config: {e}")))?;
        if config.volume <= 0.0 {
            return Err(NodeError::ConfigError(format!(
                "volume must be positive, got {}",
                config.volume
            )));
        }

        let request = OrderRequest {
            symbol: config.symbol.clone(),
            side: self.side,
            volume: config.volume,
            stop_loss: config.stop_loss,
            take_profit: config.take_profit,
        };
        let reply = ctx.place_order(&request).await;
        if reply.success {
            ctx.post_status(
                Some(node.id),
                format!("{:?} {} {}", self.side, config.volume, config.symbol),
            );
            Ok(HandlerOutcome::proceed())
        } else {
            ctx.post_status(
                Some(node.id),
                format!(
                    "order on {} rejected: {}",
                    config.symbol,
                    reply.error.as_deref().unwrap_or("unknown error")
                ),
            );
            Ok(HandlerOutcome::halt())
        }
    }
}

#[derive(Debug, Deserialize)]
struct CloseConfig {
    #[serde(default)]
    ticket: Option<u64>,
    #[serde(default)]
    symbol: Option<String>,
}

/// Closes an open position by ticket or by symbol.
pub struct ClosePositionHandler;

#[async_trait]
impl NodeHandler for ClosePositionHandler {
    async fn execute(
        &self,
        node: &FlowNode,
        _input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError> {
        if ctx.cancellation().is_cancelled() {
            return Ok(HandlerOutcome::halt());
        }
        let config: CloseConfig = serde_json::from_value(Value::Object(node.params.clone()))
            .map_err(|e| NodeError::ConfigError(format!("invalid close config: {e}")))?;
        if config.ticket.is_none() && config.symbol.as_deref().unwrap_or("").is_empty() {
            return Err(NodeError::ConfigError(
                "close-position needs a ticket or a symbol".into(),
            ));
        }

        let reply = ctx
            .close_position(&CloseRequest {
                ticket: config.ticket,
                symbol: config.symbol,
            })
            .await;
        if reply.success {
            Ok(HandlerOutcome::proceed())
        } else {
            ctx.post_status(
                Some(node.id),
                format!(
                    "close failed: {}",
                    reply.error.as_deref().unwrap_or("unknown error")
                ),
            );
            Ok(HandlerOutcome::halt())
        }
    }
}
