//! Outgoing path: tags messages with routing attributes and submits them.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::Result;
use crate::message::Message;
use crate::queue::{
    BatchEntry, CORRELATION_ID_ATTRIBUTE, MAX_SEND_BATCH_SIZE, MESSAGE_TYPE_NAME_ATTRIBUTE,
    OutgoingMessage, QueueClient,
};

/// Sends typed messages to a queue by name.
///
/// Every message leaves with exactly two attributes, `MessageTypeName` and
/// `CorrelationId`, which the consumer uses to route it. Nothing is retried.
pub struct MessageSender<C>
where
    C: QueueClient,
{
    client: Arc<C>,
}

impl<C> Clone for MessageSender<C>
where
    C: QueueClient,
{
    fn clone(&self) -> Self {
        MessageSender {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C> MessageSender<C>
where
    C: QueueClient,
{
    pub fn new(client: Arc<C>) -> Self {
        MessageSender { client }
    }

    /// Sends one message.
    ///
    /// A message without a correlation id gets a fresh one, written back onto
    /// `message` before anything is submitted.
    #[instrument(skip(self, message), fields(message_type = M::TYPE_NAME))]
    pub async fn send_one<M: Message>(&self, queue_name: &str, message: &mut M) -> Result<()> {
        let correlation_id = ensure_correlation_id(message);
        let queue_url = self.client.resolve_queue_url(queue_name).await?;

        let outgoing = encode(message, &correlation_id)?;
        self.client.send(&queue_url, outgoing).await?;

        info!(
            correlation_id = %correlation_id,
            "message of type {} sent successfully",
            M::TYPE_NAME
        );
        Ok(())
    }

    /// Sends messages in batches of at most ten.
    ///
    /// The returned report lists, per batch, how many entries were accepted
    /// and which ones the backend rejected. A request that fails as a whole
    /// aborts the remaining batches and is returned as an error; batches
    /// submitted before it stay sent.
    #[instrument(skip(self, messages), fields(message_type = M::TYPE_NAME, count = messages.len()))]
    pub async fn send_many<M: Message>(
        &self,
        queue_name: &str,
        messages: &mut [M],
    ) -> Result<BatchSendReport> {
        let queue_url = self.client.resolve_queue_url(queue_name).await?;
        let mut report = BatchSendReport::default();

        for (chunk_index, chunk) in messages.chunks_mut(MAX_SEND_BATCH_SIZE).enumerate() {
            let offset = chunk_index * MAX_SEND_BATCH_SIZE;
            let mut correlation_ids = HashMap::with_capacity(chunk.len());
            let mut entries = Vec::with_capacity(chunk.len());

            for (position, message) in chunk.iter_mut().enumerate() {
                let index = offset + position;
                let correlation_id = ensure_correlation_id(message);
                entries.push(BatchEntry {
                    id: index.to_string(),
                    message: encode(message, &correlation_id)?,
                });
                correlation_ids.insert(index.to_string(), (index, correlation_id));
            }

            let submitted = entries.len();
            let output = self
                .client
                .send_batch(&queue_url, entries)
                .await
                .inspect_err(|err| {
                    error!(batch = chunk_index, error = %err, "batch send request failed");
                })?;

            let failed: Vec<FailedSend> = output
                .failed
                .into_iter()
                .map(|failure| {
                    let (index, correlation_id) = match correlation_ids.get(&failure.id) {
                        Some((index, correlation_id)) => {
                            (Some(*index), Some(correlation_id.clone()))
                        }
                        None => {
                            warn!(
                                entry_id = %failure.id,
                                "backend reported a failure for an unknown batch entry"
                            );
                            (None, None)
                        }
                    };
                    FailedSend {
                        index,
                        message_type_name: M::TYPE_NAME,
                        correlation_id,
                        code: failure.code,
                        reason: failure.message,
                        sender_fault: failure.sender_fault,
                    }
                })
                .collect();

            if failed.is_empty() {
                info!(
                    batch = chunk_index,
                    size = submitted,
                    "successfully sent a batch of messages"
                );
            } else {
                error!(
                    batch = chunk_index,
                    size = submitted,
                    failed = failed.len(),
                    "failed to send {} messages from a batch",
                    failed.len()
                );
            }

            report.chunks.push(ChunkReport {
                submitted,
                successful: output.successful.len(),
                failed,
            });
        }

        Ok(report)
    }
}

fn ensure_correlation_id<M: Message>(message: &mut M) -> String {
    match message.correlation_id() {
        Some(correlation_id) if !correlation_id.is_empty() => correlation_id.to_string(),
        _ => {
            let correlation_id = Uuid::new_v4().to_string();
            message.set_correlation_id(correlation_id.clone());
            correlation_id
        }
    }
}

/// Body field dropped from every outgoing message; the id goes in an attribute.
const CORRELATION_ID_FIELD: &str = "correlation_id";

fn encode<M: Message>(message: &M, correlation_id: &str) -> Result<OutgoingMessage> {
    let mut body = serde_json::to_value(message)?;
    if let Some(fields) = body.as_object_mut() {
        fields.shift_remove(CORRELATION_ID_FIELD);
    }
    let body = serde_json::to_string(&body)?;
    let attributes = HashMap::from([
        (MESSAGE_TYPE_NAME_ATTRIBUTE.to_string(), M::TYPE_NAME.to_string()),
        (CORRELATION_ID_ATTRIBUTE.to_string(), correlation_id.to_string()),
    ]);
    Ok(OutgoingMessage { body, attributes })
}

/// Outcome of [`MessageSender::send_many`], one entry per submitted batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSendReport {
    pub chunks: Vec<ChunkReport>,
}

impl BatchSendReport {
    pub fn batch_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn submitted_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.submitted).sum()
    }

    pub fn successful_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.successful).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.failed.len()).sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FailedSend> {
        self.chunks.iter().flat_map(|chunk| chunk.failed.iter())
    }

    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    /// Entries in the batch request.
    pub submitted: usize,
    /// Entries the backend accepted.
    pub successful: usize,
    pub failed: Vec<FailedSend>,
}

/// A message the backend refused within an otherwise accepted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSend {
    /// Position in the slice passed to `send_many`.
    pub index: Option<usize>,
    pub message_type_name: &'static str,
    pub correlation_id: Option<String>,
    pub code: String,
    pub reason: Option<String>,
    pub sender_fault: bool,
}
