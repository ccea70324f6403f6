use serde::Deserialize;

use crate::consumer::ConsumerConfig;
use crate::errors::{Result, SqsBusError};

/// Settings for connecting to SQS and consuming the subscribed queue.
///
/// Deserializes from a PascalCase section, e.g.
///
/// ```json
/// {
///   "SubscribedQueueName": "customers",
///   "AwsRegion": "eu-west-1",
///   "MaxBatchSize": 10,
///   "WaitTimeSeconds": 20
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SqsOptions {
    /// The name of the queue to consume.
    pub subscribed_queue_name: String,

    pub aws_access_key: Option<String>,

    pub aws_secret_key: Option<String>,

    pub aws_region: Option<String>,

    /// Overrides the SQS endpoint, for LocalStack or ElasticMQ.
    pub endpoint_url: Option<String>,

    /// The maximum number of messages to receive in a single batch (1-10).
    pub max_batch_size: i32,

    /// Long-poll wait for a receive call, in seconds (0-20).
    pub wait_time_seconds: i32,
}

impl Default for SqsOptions {
    fn default() -> Self {
        SqsOptions {
            subscribed_queue_name: String::new(),
            aws_access_key: None,
            aws_secret_key: None,
            aws_region: None,
            endpoint_url: None,
            max_batch_size: ConsumerConfig::DEFAULT_MAX_BATCH_SIZE,
            wait_time_seconds: ConsumerConfig::DEFAULT_WAIT_TIME_SECONDS,
        }
    }
}

impl SqsOptions {
    /// Loads options from the process environment.
    ///
    /// Reads `SQS_SUBSCRIBED_QUEUE_NAME`, `SQS_MAX_BATCH_SIZE`,
    /// `SQS_WAIT_TIME_SECONDS`, `SQS_ENDPOINT_URL`, `AWS_ACCESS_KEY_ID`,
    /// `AWS_SECRET_ACCESS_KEY` and `AWS_REGION`. Unset variables keep their
    /// defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads options through `lookup`, using the same keys as
    /// [`SqsOptions::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = SqsOptions::default();
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(queue_name) = lookup("SQS_SUBSCRIBED_QUEUE_NAME") {
            options.subscribed_queue_name = queue_name;
        }
        if let Some(value) = lookup("SQS_MAX_BATCH_SIZE") {
            options.max_batch_size = parse_number("SQS_MAX_BATCH_SIZE", &value)?;
        }
        if let Some(value) = lookup("SQS_WAIT_TIME_SECONDS") {
            options.wait_time_seconds = parse_number("SQS_WAIT_TIME_SECONDS", &value)?;
        }
        options.endpoint_url = lookup("SQS_ENDPOINT_URL");
        options.aws_access_key = lookup("AWS_ACCESS_KEY_ID");
        options.aws_secret_key = lookup("AWS_SECRET_ACCESS_KEY");
        options.aws_region = lookup("AWS_REGION");

        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.aws_access_key.is_some() != self.aws_secret_key.is_some() {
            return Err(SqsBusError::config(
                "AWS access key and secret key must be provided together",
            ));
        }
        self.consumer_config().validate()
    }

    /// The subset of options the consumer needs.
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            queue_name: self.subscribed_queue_name.clone(),
            max_batch_size: self.max_batch_size,
            wait_time_seconds: self.wait_time_seconds,
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| SqsBusError::config(format!("{key} must be an integer, got '{value}'")))
}
