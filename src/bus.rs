use crate::dispatcher::{Dispatcher, HandlerBinding};
use crate::errors::{Result, SqsBusError};
use crate::message::{Message, MessageHandler};

/// Collects message type → handler bindings before the bus starts.
///
/// Each message type may be registered once. The builder is consumed by
/// [`MessageBusBuilder::build`], after which the binding table can no longer
/// change.
///
/// ```rust,no_run
/// # use rs_sqs_bus::{MessageBusBuilder, Message, MessageHandler, Result};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Serialize, Deserialize)]
/// # struct CustomerCreated { name: String }
/// # impl Message for CustomerCreated {
/// #     const TYPE_NAME: &'static str = "CustomerCreated";
/// #     fn correlation_id(&self) -> Option<&str> { None }
/// #     fn set_correlation_id(&mut self, _id: String) {}
/// # }
/// # #[derive(Default)]
/// # struct CustomerCreatedHandler;
/// # #[async_trait::async_trait]
/// # impl MessageHandler<CustomerCreated> for CustomerCreatedHandler {
/// #     async fn handle(&self, _message: CustomerCreated) -> Result<()> { Ok(()) }
/// # }
/// # fn main() -> Result<()> {
/// let mut builder = MessageBusBuilder::new();
/// builder.register_default::<CustomerCreated, CustomerCreatedHandler>()?;
/// let dispatcher = builder.build()?;
/// assert!(dispatcher.can_handle("CustomerCreated"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MessageBusBuilder {
    bindings: Vec<HandlerBinding>,
}

impl MessageBusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `M` to handlers produced by `factory`, one per dispatched message.
    pub fn register<M, H, F>(&mut self, factory: F) -> Result<&mut Self>
    where
        M: Message,
        H: MessageHandler<M> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        if M::TYPE_NAME.is_empty() {
            return Err(SqsBusError::config(format!(
                "message type {} declares an empty TYPE_NAME",
                std::any::type_name::<M>()
            )));
        }
        if self.is_registered(M::TYPE_NAME) {
            return Err(SqsBusError::DuplicateHandler {
                type_name: M::TYPE_NAME.to_string(),
            });
        }

        self.bindings.push(HandlerBinding::new::<M, H, F>(factory));
        Ok(self)
    }

    /// Binds `M` to `H::default()`.
    pub fn register_default<M, H>(&mut self) -> Result<&mut Self>
    where
        M: Message,
        H: MessageHandler<M> + Default + 'static,
    {
        self.register::<M, H, _>(H::default)
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.bindings
            .iter()
            .any(|binding| binding.kind().type_name() == type_name)
    }

    pub fn bindings(&self) -> &[HandlerBinding] {
        &self.bindings
    }

    /// Installs every binding into a new [`Dispatcher`].
    pub fn build(self) -> Result<Dispatcher> {
        let mut dispatcher = Dispatcher::new();
        for binding in self.bindings {
            dispatcher.install(binding)?;
        }
        Ok(dispatcher)
    }
}
