use std::str::FromStr;

use thiserror::Error;

/// Result type for message bus operations.
pub type Result<T> = std::result::Result<T, SqsBusError>;

/// Error types for the SQS message bus.
///
/// Variants fall into three groups: startup failures (`Configuration`,
/// `QueueNotFound`), per-message or per-request failures that the consumer
/// logs and isolates (`Transport`, `MalformedMessage`, `Serialization`,
/// `GenericError`), and binding-table mistakes that indicate a
/// misconfigured bus (`DuplicateHandler`, `HandlerNotFound`,
/// `MessageTypeMismatch`).
#[derive(Debug, Error)]
pub enum SqsBusError {
    /// Invalid configuration detected before any queue I/O.
    #[error("invalid SQS configuration: {0}")]
    Configuration(String),

    /// The named queue does not exist or its URL could not be resolved.
    #[error("queue '{queue_name}' could not be resolved")]
    QueueNotFound { queue_name: String },

    /// A call to the queue backend failed.
    #[error("SQS {operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// A handler is already bound to this message type name.
    #[error("a handler is already registered for message type '{type_name}'")]
    DuplicateHandler { type_name: String },

    /// No handler is bound to this message type name.
    #[error("no handler registered for message type '{type_name}'")]
    HandlerNotFound { type_name: String },

    /// A dispatched payload is not the Rust type registered for its name.
    #[error("payload dispatched as '{type_name}' is not of the registered type {expected}")]
    MessageTypeMismatch {
        type_name: String,
        expected: &'static str,
    },

    /// A received message lacks something required to process it.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("message serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("consumer task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("{0}")]
    GenericError(#[from] GenericError),
}

impl SqsBusError {
    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a transport error for the given backend operation.
    pub fn transport<E: std::fmt::Display>(operation: &'static str, error: E) -> Self {
        Self::Transport {
            operation,
            message: error.to_string(),
        }
    }

    /// Creates a malformed message error.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedMessage(message.into())
    }
}

/// Error type handlers are expected to return for their own failures.
///
/// It converts into [`SqsBusError::GenericError`], so a handler can write
/// `Err(GenericError::from("customer store rejected the write").into())`.
/// The message is logged by the consumer and the queue message is left for
/// redelivery.
#[derive(Debug, Error)]
pub struct GenericError(String);

impl GenericError {
    /// Creates a new `GenericError` with the provided message.
    pub fn new(message: String) -> Self {
        GenericError(message)
    }
}

impl std::fmt::Display for GenericError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GenericError {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(GenericError::new(s.to_string()))
    }
}

impl From<String> for GenericError {
    fn from(s: String) -> Self {
        GenericError::new(s)
    }
}

impl From<&str> for GenericError {
    fn from(s: &str) -> Self {
        GenericError::new(s.to_string())
    }
}
