//! Market data node handlers: quote fetch and numeric condition checks.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::context::RuntimeContext;
use crate::error::NodeError;
use crate::graph::FlowNode;

use super::executor::{HandlerOutcome, NodeHandler};

#[derive(Debug, Deserialize)]
struct PriceCheckConfig {
    symbol: String,
}

/// Fetches a quote for the configured symbol and caches it for consumers
/// wired to the data output. A backend error halts the branch.
pub struct PriceCheckHandler;

#[async_trait]
impl NodeHandler for PriceCheckHandler {
    async fn execute(
        &self,
        node: &FlowNode,
        _input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError> {
        if ctx.cancellation().is_cancelled() {
            return Ok(HandlerOutcome::halt());
        }
        let config: PriceCheckConfig =
            serde_json::from_value(Value::Object(node.params.clone()))
                .map_err(|e| NodeError::ConfigError(format!("invalid price-check config: {e}")))?;

        let reply = ctx.quote(&config.symbol).await;
        if !reply.success {
            ctx.post_status(
                Some(node.id),
                format!(
                    "quote for {} failed: {}",
                    config.symbol,
                    reply.error.as_deref().unwrap_or("unknown error")
                ),
            );
            return Ok(HandlerOutcome::halt());
        }

        let mut outcome = HandlerOutcome::proceed();
        if let Some(data) = reply.data_string() {
            outcome = outcome.with_output(data);
        }
        Ok(outcome)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
}

impl CompareOp {
    fn apply(self, actual: f64, expected: f64) -> bool {
        match self {
            CompareOp::Gt => actual > expected,
            CompareOp::Lt => actual < expected,
            CompareOp::Gte => actual >= expected,
            CompareOp::Lte => actual <= expected,
            CompareOp::Eq => actual == expected,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConditionalConfig {
    operator: CompareOp,
    value: f64,
    #[serde(default)]
    symbol: Option<String>,
}

/// Compares a numeric value against the configured threshold. The value
/// comes from the first connected data input; with no data input wired, a
/// `symbol` param triggers a fresh quote instead. The comparison result is
/// the flow result.
pub struct ConditionalHandler;

#[async_trait]
impl NodeHandler for ConditionalHandler {
    async fn execute(
        &self,
        node: &FlowNode,
        _input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError> {
        let config: ConditionalConfig =
            serde_json::from_value(Value::Object(node.params.clone()))
                .map_err(|e| NodeError::ConfigError(format!("invalid conditional config: {e}")))?;

        let upstream = ctx.upstream_data(node.id);
        let actual = if let Some(data) = upstream.first() {
            parse_numeric(data)?
        } else if let Some(symbol) = &config.symbol {
            let reply = ctx.quote(symbol).await;
            match reply.data_string() {
                Some(data) if reply.success => parse_numeric(&data)?,
                _ => {
                    ctx.post_status(
                        Some(node.id),
                        format!(
                            "quote for {symbol} failed: {}",
                            reply.error.as_deref().unwrap_or("unknown error")
                        ),
                    );
                    return Ok(HandlerOutcome::halt());
                }
            }
        } else {
            return Err(NodeError::ConfigError(
                "conditional has neither a data input nor a symbol".into(),
            ));
        };

        Ok(HandlerOutcome {
            proceed: config.operator.apply(actual, config.value),
            output: None,
        })
    }
}

/// Extract a price from raw upstream data: a bare number, or a quote
/// object's `bid`/`price`/`ask` field.
fn parse_numeric(data: &str) -> Result<f64, NodeError> {
    let trimmed = data.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        return Ok(n);
    }
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|_| NodeError::DataError(format!("not numeric: {trimmed:?}")))?;
    for key in ["bid", "price", "ask"] {
        if let Some(n) = value.get(key).and_then(Value::as_f64) {
            return Ok(n);
        }
    }
    value
        .as_f64()
        .ok_or_else(|| NodeError::DataError(format!("no price field in {trimmed:?}")))
}
