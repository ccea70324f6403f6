#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rs_sqs_bus::{
    BatchEntry, BatchEntryFailure, BatchSendOutput, CORRELATION_ID_ATTRIBUTE, GenericError,
    MESSAGE_TYPE_NAME_ATTRIBUTE, Message, MessageHandler, OutgoingMessage, QueueClient,
    RawMessage, Result, SqsBusError,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory stand-in for SQS.
///
/// Receive calls pop scripted responses; once the script runs dry they wait
/// out the requested long-poll time and return nothing.
#[derive(Default)]
pub struct InMemoryQueue {
    queues: HashMap<String, String>,
    receive_script: Mutex<VecDeque<Result<Vec<RawMessage>>>>,
    receive_calls: AtomicUsize,
    deleted: Mutex<Vec<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    batches: Mutex<Vec<(String, Vec<BatchEntry>)>>,
    batch_failures: Mutex<HashMap<usize, usize>>,
    fail_sends: Mutex<bool>,
}

impl InMemoryQueue {
    pub fn with_queue(queue_name: &str) -> Self {
        let mut queue = InMemoryQueue::default();
        queue.queues.insert(queue_name.to_string(), queue_url(queue_name));
        queue
    }

    pub fn push_batch(&self, messages: Vec<RawMessage>) {
        self.receive_script.lock().unwrap().push_back(Ok(messages));
    }

    pub fn push_receive_error(&self, message: &str) {
        self.receive_script
            .lock()
            .unwrap()
            .push_back(Err(SqsBusError::transport("receive_message", message)));
    }

    /// Rejects the first `count` entries of the batch request numbered `batch`.
    pub fn fail_batch_entries(&self, batch: usize, count: usize) {
        self.batch_failures.lock().unwrap().insert(batch, count);
    }

    pub fn fail_deletes_for(&self, receipt_handle: &str) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(receipt_handle.to_string());
    }

    pub fn fail_sends(&self) {
        *self.fail_sends.lock().unwrap() = true;
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<(String, Vec<BatchEntry>)> {
        self.batches.lock().unwrap().clone()
    }
}

pub fn queue_url(queue_name: &str) -> String {
    format!("https://sqs.eu-west-1.amazonaws.com/000000000000/{queue_name}")
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn resolve_queue_url(&self, queue_name: &str) -> Result<String> {
        self.queues
            .get(queue_name)
            .cloned()
            .ok_or_else(|| SqsBusError::QueueNotFound {
                queue_name: queue_name.to_string(),
            })
    }

    async fn receive(
        &self,
        _queue_url: &str,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<RawMessage>> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.receive_script.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(messages)) => {
                assert!(messages.len() <= max_messages as usize);
                Ok(messages)
            }
            Some(Err(err)) => Err(err),
            None => {
                tokio::time::sleep(Duration::from_secs(wait_time_seconds as u64)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn delete(&self, _queue_url: &str, receipt_handle: &str) -> Result<()> {
        if self.failing_deletes.lock().unwrap().contains(receipt_handle) {
            return Err(SqsBusError::transport("delete_message", "receipt handle expired"));
        }
        self.deleted.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }

    async fn send(&self, queue_url: &str, message: OutgoingMessage) -> Result<()> {
        if *self.fail_sends.lock().unwrap() {
            return Err(SqsBusError::transport("send_message", "service unavailable"));
        }
        self.sent.lock().unwrap().push((queue_url.to_string(), message));
        Ok(())
    }

    async fn send_batch(
        &self,
        queue_url: &str,
        entries: Vec<BatchEntry>,
    ) -> Result<BatchSendOutput> {
        assert!(entries.len() <= rs_sqs_bus::MAX_SEND_BATCH_SIZE);

        let mut batches = self.batches.lock().unwrap();
        let failing = self
            .batch_failures
            .lock()
            .unwrap()
            .get(&batches.len())
            .copied()
            .unwrap_or(0);

        let (failed, successful) = entries.split_at(failing.min(entries.len()));
        let output = BatchSendOutput {
            successful: successful.iter().map(|entry| entry.id.clone()).collect(),
            failed: failed
                .iter()
                .map(|entry| BatchEntryFailure {
                    id: entry.id.clone(),
                    code: "InternalError".to_string(),
                    message: Some("try again later".to_string()),
                    sender_fault: false,
                })
                .collect(),
        };

        batches.push((queue_url.to_string(), entries));
        Ok(output)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerCreated {
    pub name: String,
    #[serde(skip)]
    pub correlation_id: Option<String>,
}

impl CustomerCreated {
    pub fn named(name: &str) -> Self {
        CustomerCreated {
            name: name.to_string(),
            correlation_id: None,
        }
    }
}

impl Message for CustomerCreated {
    const TYPE_NAME: &'static str = "CustomerCreated";

    fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    fn set_correlation_id(&mut self, correlation_id: String) {
        self.correlation_id = Some(correlation_id);
    }
}

/// Records every message its handlers see.
#[derive(Default)]
pub struct Recorder {
    handled: Mutex<Vec<CustomerCreated>>,
}

impl Recorder {
    pub fn handled(&self) -> Vec<CustomerCreated> {
        self.handled.lock().unwrap().clone()
    }

    pub fn handled_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handled().into_iter().map(|m| m.name).collect();
        names.sort();
        names
    }
}

/// Fails for customers named "fail" and panics for customers named "panic".
pub struct CustomerCreatedHandler {
    pub recorder: Arc<Recorder>,
}

#[async_trait]
impl MessageHandler<CustomerCreated> for CustomerCreatedHandler {
    async fn handle(&self, message: CustomerCreated) -> Result<()> {
        match message.name.as_str() {
            "fail" => Err(GenericError::from("customer store rejected the write").into()),
            "panic" => panic!("handler blew up"),
            _ => {
                self.recorder.handled.lock().unwrap().push(message);
                Ok(())
            }
        }
    }
}

pub fn raw_message(id: &str, type_name: Option<&str>, body: &str) -> RawMessage {
    let mut attributes = HashMap::new();
    if let Some(type_name) = type_name {
        attributes.insert(MESSAGE_TYPE_NAME_ATTRIBUTE.to_string(), type_name.to_string());
    }
    attributes.insert(CORRELATION_ID_ATTRIBUTE.to_string(), format!("corr-{id}"));

    RawMessage {
        message_id: Some(id.to_string()),
        body: Some(body.to_string()),
        receipt_handle: Some(format!("receipt-{id}")),
        attributes,
    }
}

pub fn customer_message(id: &str, name: &str) -> RawMessage {
    raw_message(
        id,
        Some(CustomerCreated::TYPE_NAME),
        &format!(r#"{{"name":"{name}"}}"#),
    )
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually<F>(condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
