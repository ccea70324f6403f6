use crate::errors::{Result, SqsBusError};

/// Configuration for the message consumer.
///
/// This struct defines which queue is consumed and how each receive call is
/// shaped: the maximum number of messages per batch and the long-poll wait.
///
/// # Fields
/// - `queue_name`: The name of the queue to consume; resolved to a URL at startup.
/// - `max_batch_size`: The maximum number of messages to receive in a single request (1-10).
/// - `wait_time_seconds`: The wait time for long polling, in seconds (0-20).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// The name of the queue to consume.
    pub queue_name: String,

    /// The maximum number of messages to receive in a single request.
    pub max_batch_size: i32,

    /// The wait time for long polling, in seconds.
    pub wait_time_seconds: i32,
}

impl ConsumerConfig {
    pub const DEFAULT_MAX_BATCH_SIZE: i32 = 1;
    pub const DEFAULT_WAIT_TIME_SECONDS: i32 = 20;

    /// Creates a configuration for `queue_name` with default polling settings.
    pub fn new<S: Into<String>>(queue_name: S) -> Self {
        ConsumerConfig {
            queue_name: queue_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_batch_size(mut self, max_batch_size: i32) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_wait_time_seconds(mut self, wait_time_seconds: i32) -> Self {
        self.wait_time_seconds = wait_time_seconds;
        self
    }

    /// Checks the values against the limits SQS enforces.
    pub fn validate(&self) -> Result<()> {
        if self.queue_name.trim().is_empty() {
            return Err(SqsBusError::config("subscribed queue name must not be empty"));
        }
        if !(1..=10).contains(&self.max_batch_size) {
            return Err(SqsBusError::config(format!(
                "max batch size must be between 1 and 10, got {}",
                self.max_batch_size
            )));
        }
        if !(0..=20).contains(&self.wait_time_seconds) {
            return Err(SqsBusError::config(format!(
                "wait time must be between 0 and 20 seconds, got {}",
                self.wait_time_seconds
            )));
        }
        Ok(())
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            queue_name: String::new(),
            max_batch_size: Self::DEFAULT_MAX_BATCH_SIZE,
            wait_time_seconds: Self::DEFAULT_WAIT_TIME_SECONDS,
        }
    }
}
