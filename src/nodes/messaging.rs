//! Outbound messaging handlers: user alerts and LLM completions.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::context::{AlertChannel, RuntimeContext};
use crate::error::NodeError;
use crate::graph::FlowNode;

use super::executor::{HandlerOutcome, NodeHandler};

#[derive(Debug, Deserialize)]
struct AlertConfig {
    channel: AlertChannel,
    to: String,
    #[serde(default)]
    message: String,
}

/// Sends an SMS/WhatsApp alert. Data wired into the alert's data input is
/// appended to the configured message, so a price-check can feed its quote
/// straight into the notification.
pub struct AlertHandler;

#[async_trait]
impl NodeHandler for AlertHandler {
    async fn execute(
        &self,
        node: &FlowNode,
        _input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError> {
        if ctx.cancellation().is_cancelled() {
            return Ok(HandlerOutcome::halt());
        }
        let config: AlertConfig = serde_json::from_value(Value::Object(node.params.clone()))
            .map_err(|e| NodeError::ConfigError(format!("invalid alert config: {e}")))?;
        if config.to.is_empty() {
            return Err(NodeError::ConfigError("alert has no recipient".into()));
        }

        let mut body = config.message.clone();
        for data in ctx.upstream_data(node.id) {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(&data);
        }

        let reply = ctx.send_alert(config.channel, &config.to, &body).await;
        if reply.success {
            Ok(HandlerOutcome::proceed())
        } else {
            ctx.post_status(
                Some(node.id),
                format!(
                    "alert delivery failed: {}",
                    reply.error.as_deref().unwrap_or("unknown error")
                ),
            );
            Ok(HandlerOutcome::halt())
        }
    }
}

#[derive(Debug, Deserialize)]
struct LlmConfig {
    model: String,
    prompt: String,
}

/// Runs a chat completion. Upstream data is appended to the prompt as
/// context; the reply is cached on the node for downstream consumers.
pub struct LlmHandler;

#[async_trait]
impl NodeHandler for LlmHandler {
    async fn execute(
        &self,
        node: &FlowNode,
        _input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError> {
        if ctx.cancellation().is_cancelled() {
            return Ok(HandlerOutcome::halt());
        }
        let config: LlmConfig = serde_json::from_value(Value::Object(node.params.clone()))
            .map_err(|e| NodeError::ConfigError(format!("invalid llm config: {e}")))?;

        let mut prompt = config.prompt.clone();
        for data in ctx.upstream_data(node.id) {
            prompt.push_str("\n\n");
            prompt.push_str(&data);
        }

        let reply = ctx.complete(&config.model, &prompt).await;
        if !reply.success {
            ctx.post_status(
                Some(node.id),
                format!(
                    "completion failed: {}",
                    reply.error.as_deref().unwrap_or("unknown error")
                ),
            );
            return Ok(HandlerOutcome::halt());
        }

        let mut outcome = HandlerOutcome::proceed();
        if let Some(text) = reply.data_string() {
            outcome = outcome.with_output(text);
        }
        Ok(outcome)
    }
}
