//! The contracts every routable message and every handler satisfy.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::Result;

/// A message that can be sent through the bus and routed back to a handler.
///
/// The routing key is [`Message::TYPE_NAME`], an associated constant, so every
/// instance of a kind carries the same name and it can never drift from what
/// was registered. The correlation id travels as a queue attribute, never in
/// the body: mark the field `#[serde(skip)]`. A top-level `correlation_id`
/// field that is still serialized is removed from the body before sending.
///
/// ```rust
/// use rs_sqs_bus::Message;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct CustomerCreated {
///     name: String,
///     #[serde(skip)]
///     correlation_id: Option<String>,
/// }
///
/// impl Message for CustomerCreated {
///     const TYPE_NAME: &'static str = "CustomerCreated";
///
///     fn correlation_id(&self) -> Option<&str> {
///         self.correlation_id.as_deref()
///     }
///
///     fn set_correlation_id(&mut self, correlation_id: String) {
///         self.correlation_id = Some(correlation_id);
///     }
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Routing key carried in the `MessageTypeName` attribute.
    const TYPE_NAME: &'static str;

    fn correlation_id(&self) -> Option<&str>;

    fn set_correlation_id(&mut self, correlation_id: String);
}

/// Handles one kind of message.
///
/// A fresh handler is built by its registration's factory for every dispatch,
/// so handler fields are never shared between concurrently processed messages.
/// Returning `Err` leaves the message on the queue for redelivery.
#[async_trait]
pub trait MessageHandler<M: Message>: Send + Sync {
    async fn handle(&self, message: M) -> Result<()>;
}
