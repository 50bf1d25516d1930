//! Terminal control-flow handler.

use async_trait::async_trait;

use crate::core::context::RuntimeContext;
use crate::error::NodeError;
use crate::graph::FlowNode;

use super::executor::{HandlerOutcome, NodeHandler};

/// Deliberately ends the strategy branch. Useful as an explicit terminator
/// so a reader of the canvas sees where a leg is meant to stop.
pub struct EndHandler;

#[async_trait]
impl NodeHandler for EndHandler {
    async fn execute(
        &self,
        node: &FlowNode,
        _input: bool,
        ctx: &RuntimeContext,
    ) -> Result<HandlerOutcome, NodeError> {
        ctx.post_status(Some(node.id), "strategy branch ended");
        Ok(HandlerOutcome::halt())
    }
}
