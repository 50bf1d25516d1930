use async_trait::async_trait;
use std::collections::HashMap;

use crate::core::context::RuntimeContext;
use crate::error::NodeError;
use crate::graph::FlowNode;

/// What a handler tells the engine: whether flow continues past this node,
/// and an optional data payload cached on the node for consumers wired to
/// its data output.
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    pub proceed: bool,
    pub output: Option<String>,
}

impl HandlerOutcome {
    pub fn proceed() -> Self {
        HandlerOutcome {
            proceed: true,
            output: None,
        }
    }

    pub fn halt() -> Self {
        HandlerOutcome {
            proceed: false,
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Trait for node execution. Each non-gate node type implements this.
///
/// The engine consumes only the returned outcome; side effects go through
/// the injected [`RuntimeContext`]. Returning `proceed: false` (or an error,
/// which the engine folds into the same thing) is a normal strategy
/// outcome, not a bug.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn execute(
        &self,
        node: &FlowNode,
        input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError>;
}

/// Registry of node handlers by node type string.
pub struct NodeHandlerRegistry {
    handlers: HashMap<String, Box<dyn NodeHandler>>,
}

impl NodeHandlerRegistry {
    /// Registry with the built-in handlers. Trigger nodes have no handler
    /// (firing one goes straight to its successors) and gate nodes are
    /// resolved by the synchronizer.
    pub fn new() -> Self {
        let mut registry = NodeHandlerRegistry {
            handlers: HashMap::new(),
        };
        registry.register("price-check", Box::new(super::market::PriceCheckHandler));
        registry.register("conditional", Box::new(super::market::ConditionalHandler));
        registry.register("buy-order", Box::new(super::orders::OrderHandler::buy()));
        registry.register("sell-order", Box::new(super::orders::OrderHandler::sell()));
        registry.register(
            "close-position",
            Box::new(super::orders::ClosePositionHandler),
        );
        registry.register("alert", Box::new(super::messaging::AlertHandler));
        registry.register("llm", Box::new(super::messaging::LlmHandler));
        registry.register("script", Box::new(super::automation::ScriptHandler));
        registry.register("web-scrape", Box::new(super::automation::WebScrapeHandler));
        registry.register("end", Box::new(super::control_flow::EndHandler));
        registry
    }

    /// Registry with no handlers at all; callers register their own.
    pub fn empty() -> Self {
        NodeHandlerRegistry {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, node_type: &str, handler: Box<dyn NodeHandler>) {
        self.handlers.insert(node_type.to_string(), handler);
    }

    pub fn get(&self, node_type: &str) -> Option<&dyn NodeHandler> {
        self.handlers.get(node_type).map(|h| h.as_ref())
    }
}

impl Default for NodeHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
