//! Automation handlers: external scripts and web scraping.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::context::RuntimeContext;
use crate::error::NodeError;
use crate::graph::FlowNode;

use super::executor::{HandlerOutcome, NodeHandler};

#[derive(Debug, Deserialize)]
struct ScriptConfig {
    script: String,
    #[serde(default)]
    args: Vec<String>,
}

/// Runs an external script through the script host; stdout becomes the
/// node's data output.
pub struct ScriptHandler;

#[async_trait]
impl NodeHandler for ScriptHandler {
    async fn execute(
        &self,
        node: &FlowNode,
        _input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError> {
        if ctx.cancellation().is_cancelled() {
            return Ok(HandlerOutcome::halt());
        }
        let config: ScriptConfig = serde_json::from_value(Value::Object(node.params.clone()))
            .map_err(|e| NodeError::ConfigError(format!("invalid script config: {e}")))?;
        if config.script.is_empty() {
            return Err(NodeError::ConfigError("script path is empty".into()));
        }

        let reply = ctx.run_script(&config.script, &config.args).await;
        if !reply.success {
            ctx.post_status(
                Some(node.id),
                format!(
                    "script {} failed: {}",
                    config.script,
                    reply.error.as_deref().unwrap_or("unknown error")
                ),
            );
            return Ok(HandlerOutcome::halt());
        }

        let mut outcome = HandlerOutcome::proceed();
        if let Some(stdout) = reply.data_string() {
            outcome = outcome.with_output(stdout);
        }
        Ok(outcome)
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeConfig {
    url: String,
}

/// Fetches a URL; the body becomes the node's data output.
pub struct WebScrapeHandler;

#[async_trait]
impl NodeHandler for WebScrapeHandler {
    async fn execute(
        &self,
        node: &FlowNode,
        _input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError> {
        if ctx.cancellation().is_cancelled() {
            return Ok(HandlerOutcome::halt());
        }
        let config: ScrapeConfig = serde_json::from_value(Value::Object(node.params.clone()))
            .map_err(|e| NodeError::ConfigError(format!("invalid web-scrape config: {e}")))?;
        if config.url.is_empty() {
            return Err(NodeError::ConfigError("url is empty".into()));
        }

        let reply = ctx.fetch_url(&config.url).await;
        if !reply.success {
            ctx.post_status(
                Some(node.id),
                format!(
                    "fetch of {} failed: {}",
                    config.url,
                    reply.error.as_deref().unwrap_or("unknown error")
                ),
            );
            return Ok(HandlerOutcome::halt());
        }

        let mut outcome = HandlerOutcome::proceed();
        if let Some(body) = reply.data_string() {
            outcome = outcome.with_output(body);
        }
        Ok(outcome)
    }
}
