use thiserror::Error;

/// Handler-level errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Capability not configured: {0}")]
    MissingCapability(&'static str),
    #[error("Capability call failed: {0}")]
    CapabilityError(String),
    #[error("Data error: {0}")]
    DataError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Strategy stopped")]
    Cancelled,
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::SerializationError(e.to_string())
    }
}
