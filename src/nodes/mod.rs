pub mod automation;
pub mod control_flow;
pub mod executor;
pub mod market;
pub mod messaging;
pub mod orders;

pub use executor::{HandlerOutcome, NodeHandler, NodeHandlerRegistry};
