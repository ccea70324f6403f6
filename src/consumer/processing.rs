use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::errors::{Result, SqsBusError};
use crate::queue::{MESSAGE_TYPE_NAME_ATTRIBUTE, QueueClient, RawMessage};

/// What happened to one received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageOutcome {
    /// Handled and deleted from the queue.
    Acked,
    /// No routing attribute; left on the queue.
    MissingTypeName,
    /// No handler for its type; left on the queue.
    Unroutable,
    /// Decoding, handling or deletion failed; left on the queue.
    Failed,
}

/// Counts of message outcomes for one received batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchSummary {
    pub acked: usize,
    pub dropped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Acked => self.acked += 1,
            MessageOutcome::MissingTypeName | MessageOutcome::Unroutable => self.dropped += 1,
            MessageOutcome::Failed => self.failed += 1,
        }
    }
}

/// Routes one received message and deletes it once its handler succeeds.
///
/// Never returns an error: every failure is logged here and the message is
/// left for the queue to redeliver.
pub(crate) async fn process_message<C>(
    client: &C,
    dispatcher: &Dispatcher,
    queue_url: &str,
    message: RawMessage,
) -> MessageOutcome
where
    C: QueueClient + ?Sized,
{
    let message_id = message.message_id.as_deref().unwrap_or("<unknown>");

    let Some(type_name) = message.message_type_name() else {
        error!(
            message_id,
            "received a message with a missing or empty {MESSAGE_TYPE_NAME_ATTRIBUTE} attribute"
        );
        return MessageOutcome::MissingTypeName;
    };

    if !dispatcher.can_handle(type_name) {
        info!(
            message_id,
            message_type = type_name,
            "no handler registered for message type, leaving it on the queue"
        );
        return MessageOutcome::Unroutable;
    }

    match handle_and_ack(client, dispatcher, queue_url, &message, type_name).await {
        Ok(correlation_id) => {
            info!(
                message_id,
                message_type = type_name,
                correlation_id = correlation_id.as_deref().unwrap_or_default(),
                "message processed successfully"
            );
            MessageOutcome::Acked
        }
        Err(err) => {
            error!(
                message_id,
                message_type = type_name,
                correlation_id = message.correlation_id().unwrap_or_default(),
                error = %err,
                "failed to process message"
            );
            MessageOutcome::Failed
        }
    }
}

async fn handle_and_ack<C>(
    client: &C,
    dispatcher: &Dispatcher,
    queue_url: &str,
    message: &RawMessage,
    type_name: &str,
) -> Result<Option<String>>
where
    C: QueueClient + ?Sized,
{
    let kind = dispatcher
        .message_kind_for(type_name)
        .ok_or_else(|| SqsBusError::HandlerNotFound {
            type_name: type_name.to_string(),
        })?;

    let body = message
        .body
        .as_deref()
        .ok_or_else(|| SqsBusError::malformed("message has no body"))?;

    let decoded = kind.decode(body, message.correlation_id())?;
    let correlation_id = decoded.correlation_id().map(str::to_string);
    debug!(
        message_type = type_name,
        rust_type = kind.rust_type(),
        "dispatching message"
    );

    dispatcher.dispatch(decoded).await?;

    let Some(receipt_handle) = message.receipt_handle.as_deref() else {
        warn!(message_type = type_name, "handled message has no receipt handle");
        return Err(SqsBusError::malformed(
            "message was handled but has no receipt handle to delete it with",
        ));
    };
    client.delete(queue_url, receipt_handle).await?;

    Ok(correlation_id)
}
