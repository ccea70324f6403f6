//! # SQS Message Bus
//!
//! A typed message bus over AWS SQS. Messages are routed to handlers by a type
//! name carried in the `MessageTypeName` message attribute, so one queue can
//! carry many kinds of messages.
//!
//! ## Features
//!
//! - Static registry of message type → handler factory, fixed at startup
//! - Long-polling consumer with concurrent batch processing and graceful shutdown
//! - Automatic message deletion on successful processing; failures stay on the
//!   queue for redelivery (at-least-once, no deduplication)
//! - Continue-on-error semantics: one failing message never affects its batch
//! - Sender that tags every message with routing and correlation attributes,
//!   individually or in batches of ten with per-entry failure reporting
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use rs_sqs_bus::{
//!     ConsumerConfig, Message, MessageBusBuilder, MessageConsumer, MessageHandler,
//!     MessageSender, Result, client::create_sqs_client_from_env,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct CustomerCreated {
//!     name: String,
//!     #[serde(skip)]
//!     correlation_id: Option<String>,
//! }
//!
//! impl Message for CustomerCreated {
//!     const TYPE_NAME: &'static str = "CustomerCreated";
//!
//!     fn correlation_id(&self) -> Option<&str> {
//!         self.correlation_id.as_deref()
//!     }
//!
//!     fn set_correlation_id(&mut self, correlation_id: String) {
//!         self.correlation_id = Some(correlation_id);
//!     }
//! }
//!
//! #[derive(Default)]
//! struct CustomerCreatedHandler;
//!
//! #[async_trait]
//! impl MessageHandler<CustomerCreated> for CustomerCreatedHandler {
//!     async fn handle(&self, message: CustomerCreated) -> Result<()> {
//!         println!("Customer created with name {}", message.name);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Arc::new(create_sqs_client_from_env().await);
//!
//!     let mut builder = MessageBusBuilder::new();
//!     builder.register_default::<CustomerCreated, CustomerCreatedHandler>()?;
//!     let dispatcher = Arc::new(builder.build()?);
//!
//!     let consumer = MessageConsumer::new(
//!         Arc::clone(&client),
//!         dispatcher,
//!         ConsumerConfig::new("customers").with_max_batch_size(10),
//!     );
//!     let handle = consumer.start().await?;
//!
//!     let sender = MessageSender::new(client);
//!     let mut message = CustomerCreated { name: "Bappy".to_string(), correlation_id: None };
//!     sender.send_one("customers", &mut message).await?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     handle.stop().await
//! }
//! ```

pub mod bus;
pub mod client;
pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod errors;
pub mod message;
pub mod queue;
pub mod sender;

pub use bus::MessageBusBuilder;
pub use config::SqsOptions;
pub use consumer::{ConsumerConfig, ConsumerHandle, MessageConsumer};
pub use dispatcher::{DecodedMessage, Dispatcher, HandlerBinding, MessageKind};
pub use errors::{GenericError, Result, SqsBusError};
pub use message::{Message, MessageHandler};
pub use queue::{
    BatchEntry, BatchEntryFailure, BatchSendOutput, CORRELATION_ID_ATTRIBUTE, MAX_SEND_BATCH_SIZE,
    MESSAGE_TYPE_NAME_ATTRIBUTE, OutgoingMessage, QueueClient, RawMessage,
};
pub use sender::{BatchSendReport, ChunkReport, FailedSend, MessageSender};
