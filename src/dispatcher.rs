//! Routing table and handler invocation.
//!
//! The dispatcher maps a message type name to two things: the
//! [`MessageKind`] used to decode a body, and an erased invoker that builds a
//! fresh handler and calls it. Both maps are filled once at startup and only
//! read afterwards, so a shared `Arc<Dispatcher>` needs no locking.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::{Result, SqsBusError};
use crate::message::{Message, MessageHandler};

type DecodeFn = fn(&str, Option<&str>) -> Result<DecodedMessage>;

/// Runtime descriptor of a registered message type.
#[derive(Clone, Copy)]
pub struct MessageKind {
    type_name: &'static str,
    rust_type: &'static str,
    type_id: TypeId,
    decode: DecodeFn,
}

impl MessageKind {
    pub fn of<M: Message>() -> Self {
        MessageKind {
            type_name: M::TYPE_NAME,
            rust_type: std::any::type_name::<M>(),
            type_id: TypeId::of::<M>(),
            decode: decode_json::<M>,
        }
    }

    /// The routing key of this kind.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The fully qualified Rust type behind this kind.
    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }

    pub fn is<M: Message>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    /// Decodes a JSON body into this kind.
    ///
    /// `correlation_id` comes from the message attributes; it is applied unless
    /// the decoded message already carries one.
    pub fn decode(&self, body: &str, correlation_id: Option<&str>) -> Result<DecodedMessage> {
        (self.decode)(body, correlation_id)
    }
}

impl PartialEq for MessageKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.type_name == other.type_name
    }
}

impl Eq for MessageKind {}

impl fmt::Debug for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageKind")
            .field("type_name", &self.type_name)
            .field("rust_type", &self.rust_type)
            .finish()
    }
}

fn decode_json<M: Message>(body: &str, correlation_id: Option<&str>) -> Result<DecodedMessage> {
    let mut message: M = serde_json::from_str(body)?;
    if let Some(correlation_id) = correlation_id {
        if message.correlation_id().is_none() {
            message.set_correlation_id(correlation_id.to_string());
        }
    }
    Ok(DecodedMessage::new(message))
}

/// A decoded message of some registered kind, ready for dispatch.
pub struct DecodedMessage {
    type_name: &'static str,
    correlation_id: Option<String>,
    payload: Box<dyn Any + Send>,
}

impl DecodedMessage {
    pub fn new<M: Message>(message: M) -> Self {
        DecodedMessage {
            type_name: M::TYPE_NAME,
            correlation_id: message.correlation_id().map(str::to_string),
            payload: Box::new(message),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Recovers the typed message, or gives `self` back on a type mismatch.
    pub fn downcast<M: Message>(self) -> std::result::Result<M, Self> {
        match self.payload.downcast::<M>() {
            Ok(message) => Ok(*message),
            Err(payload) => Err(DecodedMessage { payload, ..self }),
        }
    }
}

impl fmt::Debug for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedMessage")
            .field("type_name", &self.type_name)
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
trait HandlerInvoker: Send + Sync {
    async fn invoke(&self, message: DecodedMessage) -> Result<()>;

    fn handler_type(&self) -> &'static str;
}

struct FactoryInvoker<M, H, F> {
    factory: F,
    _marker: PhantomData<fn() -> (M, H)>,
}

#[async_trait]
impl<M, H, F> HandlerInvoker for FactoryInvoker<M, H, F>
where
    M: Message,
    H: MessageHandler<M> + 'static,
    F: Fn() -> H + Send + Sync + 'static,
{
    async fn invoke(&self, message: DecodedMessage) -> Result<()> {
        let message = message
            .downcast::<M>()
            .map_err(|message| SqsBusError::MessageTypeMismatch {
                type_name: message.type_name().to_string(),
                expected: std::any::type_name::<M>(),
            })?;

        let handler = (self.factory)();
        handler.handle(message).await
    }

    fn handler_type(&self) -> &'static str {
        std::any::type_name::<H>()
    }
}

/// A message kind bound to the factory that builds its handler.
#[derive(Clone)]
pub struct HandlerBinding {
    kind: MessageKind,
    invoker: Arc<dyn HandlerInvoker>,
}

impl HandlerBinding {
    pub fn new<M, H, F>(factory: F) -> Self
    where
        M: Message,
        H: MessageHandler<M> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        HandlerBinding {
            kind: MessageKind::of::<M>(),
            invoker: Arc::new(FactoryInvoker {
                factory,
                _marker: PhantomData,
            }),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn handler_type(&self) -> &'static str {
        self.invoker.handler_type()
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("kind", &self.kind)
            .field("handler_type", &self.handler_type())
            .finish()
    }
}

/// Type-name keyed routing table.
#[derive(Default)]
pub struct Dispatcher {
    message_kinds: HashMap<&'static str, MessageKind>,
    handlers: HashMap<&'static str, Arc<dyn HandlerInvoker>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding. Rejects a type name that is already installed and
    /// leaves the existing binding in place.
    pub fn install(&mut self, binding: HandlerBinding) -> Result<()> {
        let type_name = binding.kind.type_name();
        if self.handlers.contains_key(type_name) {
            return Err(SqsBusError::DuplicateHandler {
                type_name: type_name.to_string(),
            });
        }

        debug!(
            message_type = type_name,
            handler = binding.handler_type(),
            "installed message handler"
        );
        self.message_kinds.insert(type_name, binding.kind);
        self.handlers.insert(type_name, binding.invoker);
        Ok(())
    }

    pub fn can_handle(&self, type_name: &str) -> bool {
        self.handlers.contains_key(type_name)
    }

    pub fn message_kind_for(&self, type_name: &str) -> Option<MessageKind> {
        self.message_kinds.get(type_name).copied()
    }

    pub fn registered_type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.message_kinds.keys().copied()
    }

    /// Routes a decoded message to a freshly built handler and awaits it.
    ///
    /// Handler failures are returned as-is.
    pub async fn dispatch(&self, message: DecodedMessage) -> Result<()> {
        let invoker = self.handlers.get(message.type_name()).ok_or_else(|| {
            SqsBusError::HandlerNotFound {
                type_name: message.type_name().to_string(),
            }
        })?;

        invoker.invoke(message).await
    }

    pub async fn dispatch_message<M: Message>(&self, message: M) -> Result<()> {
        self.dispatch(DecodedMessage::new(message)).await
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("message_kinds", &self.message_kinds)
            .finish_non_exhaustive()
    }
}
