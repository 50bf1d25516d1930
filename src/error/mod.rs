//! Error types for the strategy engine.
//!
//! - [`NodeError`] — Errors raised during individual node handler execution.
//! - [`FlowError`] — Top-level errors for graph edits, schema import and engine setup.

pub mod flow_error;
pub mod node_error;

pub use flow_error::FlowError;
pub use node_error::NodeError;

/// Convenience alias for graph/engine-level results.
pub type FlowResult<T> = Result<T, FlowError>;
/// Convenience alias for handler-level results.
pub type NodeResult<T> = Result<T, NodeError>;
