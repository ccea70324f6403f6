//! The receive/dispatch/ack loop.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::dispatcher::Dispatcher;
use crate::errors::{Result, SqsBusError};
use crate::queue::{QueueClient, RawMessage};

mod config;
mod processing;

pub use config::ConsumerConfig;
use processing::{BatchSummary, MessageOutcome, process_message};

/// Polls one queue and routes every received message through a [`Dispatcher`].
///
/// Messages of a batch are processed concurrently, each in its own task, and
/// the next receive is issued only after the whole batch has finished. A
/// message is deleted only after its handler succeeds; anything else is left
/// on the queue for redelivery. Delivery is therefore at-least-once and a
/// redelivered message reaches its handler again, so handlers must be
/// idempotent.
pub struct MessageConsumer<C>
where
    C: QueueClient,
{
    /// The queue backend, shared with every in-flight message task.
    client: Arc<C>,

    /// The routing table, complete before the consumer starts.
    dispatcher: Arc<Dispatcher>,

    config: ConsumerConfig,
}

impl<C> MessageConsumer<C>
where
    C: QueueClient,
{
    pub fn new(client: Arc<C>, dispatcher: Arc<Dispatcher>, config: ConsumerConfig) -> Self {
        MessageConsumer {
            client,
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Resolves the queue and spawns the polling loop.
    ///
    /// Invalid configuration or an unresolvable queue fails here, before any
    /// message is received. Dropping the returned handle stops the loop.
    pub async fn start(self) -> Result<ConsumerHandle> {
        let queue_url = self.prepare().await?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move { self.poll(&queue_url, shutdown_rx).await });

        Ok(ConsumerHandle {
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// Runs the polling loop on the current task until `shutdown` fires or
    /// its sender is dropped.
    pub async fn run(&self, shutdown: oneshot::Receiver<()>) -> Result<()> {
        let queue_url = self.prepare().await?;
        self.poll(&queue_url, shutdown).await;
        Ok(())
    }

    async fn prepare(&self) -> Result<String> {
        self.config.validate()?;

        let queue_url = self
            .client
            .resolve_queue_url(&self.config.queue_name)
            .await
            .inspect_err(|err| {
                error!(
                    queue_name = %self.config.queue_name,
                    error = %err,
                    "failed to resolve subscribed queue"
                );
            })?;

        info!(
            queue_name = %self.config.queue_name,
            queue_url = %queue_url,
            message_types = ?self.dispatcher.registered_type_names().collect::<Vec<_>>(),
            "message consumer started"
        );
        Ok(queue_url)
    }

    async fn poll(&self, queue_url: &str, mut shutdown: oneshot::Receiver<()>) {
        loop {
            let received = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                received = self.client.receive(
                    queue_url,
                    self.config.max_batch_size,
                    self.config.wait_time_seconds,
                ) => received,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(err) => {
                    error!(
                        queue_name = %self.config.queue_name,
                        error = %err,
                        "receive request failed"
                    );
                    continue;
                }
            };

            if messages.is_empty() {
                debug!(queue_name = %self.config.queue_name, "no messages received");
                continue;
            }

            let summary = self.process_batch(queue_url, messages).await;
            debug!(
                queue_name = %self.config.queue_name,
                acked = summary.acked,
                dropped = summary.dropped,
                failed = summary.failed,
                "batch processed"
            );
        }

        info!(queue_name = %self.config.queue_name, "message consumer stopped");
    }

    async fn process_batch(&self, queue_url: &str, messages: Vec<RawMessage>) -> BatchSummary {
        let tasks = messages.into_iter().map(|message| {
            let client = Arc::clone(&self.client);
            let dispatcher = Arc::clone(&self.dispatcher);
            let queue_url = queue_url.to_string();
            tokio::spawn(async move {
                process_message(client.as_ref(), &dispatcher, &queue_url, message).await
            })
        });

        let mut summary = BatchSummary::default();
        for result in join_all(tasks).await {
            match result {
                Ok(outcome) => summary.record(outcome),
                Err(err) => {
                    error!(error = %err, "message processing task panicked");
                    summary.record(MessageOutcome::Failed);
                }
            }
        }
        summary
    }
}

/// Handle to a consumer spawned by [`MessageConsumer::start`].
pub struct ConsumerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Signals shutdown and waits for the loop to exit.
    ///
    /// A pending receive is abandoned at once; messages already being
    /// processed are allowed to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            // The loop may already have exited, in which case nobody listens.
            let _ = shutdown.send(());
        }
        self.task.await.map_err(SqsBusError::from)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
