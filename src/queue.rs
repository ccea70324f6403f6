//! The queue backend seam.
//!
//! [`QueueClient`] is the only surface the consumer and sender touch. The AWS
//! implementation lives in [`crate::client`]; tests substitute an in-memory
//! double.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::Result;

/// Attribute carrying the routing key of a message.
pub const MESSAGE_TYPE_NAME_ATTRIBUTE: &str = "MessageTypeName";

/// Attribute carrying the correlation id of a message.
pub const CORRELATION_ID_ATTRIBUTE: &str = "CorrelationId";

/// Largest number of entries SQS accepts in one batch send.
pub const MAX_SEND_BATCH_SIZE: usize = 10;

/// A message as received from the queue, before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    pub message_id: Option<String>,
    pub body: Option<String>,
    /// Single-use token required to delete the message.
    pub receipt_handle: Option<String>,
    /// String-valued message attributes.
    pub attributes: HashMap<String, String>,
}

impl RawMessage {
    /// The routing key, or `None` when missing or empty.
    pub fn message_type_name(&self) -> Option<&str> {
        self.attribute(MESSAGE_TYPE_NAME_ATTRIBUTE)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.attribute(CORRELATION_ID_ATTRIBUTE)
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// An encoded message ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub body: String,
    pub attributes: HashMap<String, String>,
}

/// One entry of a batch send request. `id` is unique within its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub id: String,
    pub message: OutgoingMessage,
}

/// Per-entry outcome of a batch send request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSendOutput {
    /// Ids of the entries the backend accepted.
    pub successful: Vec<String>,
    pub failed: Vec<BatchEntryFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntryFailure {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    /// Whether the backend blamed the request rather than itself.
    pub sender_fault: bool,
}

/// Operations the bus needs from a queue backend.
///
/// Implementations are shared across all concurrently processed messages and
/// must be safe to call from many tasks at once.
#[async_trait]
pub trait QueueClient: Send + Sync + 'static {
    /// Resolves a queue name to its URL. Fails with
    /// [`SqsBusError::QueueNotFound`](crate::SqsBusError::QueueNotFound) when
    /// the queue does not exist.
    async fn resolve_queue_url(&self, queue_name: &str) -> Result<String>;

    /// Long-polls for up to `max_messages` messages, waiting at most
    /// `wait_time_seconds` for the first one to arrive.
    async fn receive(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<RawMessage>>;

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<()>;

    async fn send(&self, queue_url: &str, message: OutgoingMessage) -> Result<()>;

    /// Submits at most [`MAX_SEND_BATCH_SIZE`] entries in one request.
    async fn send_batch(&self, queue_url: &str, entries: Vec<BatchEntry>)
    -> Result<BatchSendOutput>;
}
