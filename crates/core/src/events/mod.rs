//! Patient lifecycle events.
//!
//! Publishing is split in two halves joined by a bounded channel:
//!
//! ```text
//! orchestrator --publish--> [ChannelEventPublisher] ==mpsc==> [EventDeliveryWorker] --> EventTransport
//! ```
//!
//! [`EventPublisher::publish`] returning `Ok` means the event was accepted for delivery, not
//! that it was delivered. The hand-off waits at most a short, configured time for buffer
//! space. Delivery happens on the worker task: it encodes each event as protobuf and gives it
//! to an [`EventTransport`]. Delivery failures are logged and the event is dropped; nothing
//! is retried and nothing flows back to the request that published the event.

mod kafka;

pub use kafka::KafkaRestTransport;

use std::sync::Arc;
use std::time::Duration;

use api_shared::events::PatientEvent;
use async_trait::async_trait;
use patient_types::PatientId;
use prost::Message;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::constants::PATIENT_CREATED_EVENT;
use crate::patient::PatientRecord;

/// Snapshot of a patient record at the moment of a lifecycle change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientLifecycleEvent {
    pub patient_id: PatientId,
    pub name: String,
    pub email: String,
    pub address: String,
    pub date_of_birth: String,
    pub registered_date: String,
    pub event_type: String,
}

impl PatientLifecycleEvent {
    pub fn created(record: &PatientRecord) -> Self {
        Self {
            patient_id: record.id,
            name: record.name.to_string(),
            email: record.email.to_string(),
            address: record.address.to_string(),
            date_of_birth: record.date_of_birth.to_string(),
            registered_date: record.registered_date.to_string(),
            event_type: PATIENT_CREATED_EVENT.to_owned(),
        }
    }

    pub fn to_proto(&self) -> PatientEvent {
        PatientEvent {
            patient_id: self.patient_id.to_string(),
            name: self.name.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            date_of_birth: self.date_of_birth.clone(),
            registered_date: self.registered_date.clone(),
            event_type: self.event_type.clone(),
        }
    }

    /// Protobuf wire encoding of the event.
    pub fn encode(&self) -> Vec<u8> {
        self.to_proto().encode_to_vec()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event buffer full, hand-off timed out after {0:?}")]
    BufferFull(Duration),
    #[error("event delivery worker has stopped")]
    Closed,
    #[error("broker request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("broker rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound side of lifecycle publishing as seen by the orchestrator.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hand `event` off for asynchronous delivery.
    ///
    /// # Errors
    ///
    /// Fails only if the event could not be handed off; delivery failures are never reported
    /// here.
    async fn publish(&self, event: PatientLifecycleEvent) -> Result<(), PublishError>;
}

/// Delivers encoded events to a broker.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// Publisher that enqueues events on a bounded channel.
#[derive(Clone)]
pub struct ChannelEventPublisher {
    tx: mpsc::Sender<PatientLifecycleEvent>,
    handoff_timeout: Duration,
}

impl ChannelEventPublisher {
    /// Creates a publisher and the worker that drains it.
    ///
    /// The worker must be spawned (see [`EventDeliveryWorker::run`]) for events to leave the
    /// process. It stops once every publisher clone has been dropped and the buffer is empty.
    pub fn new(
        capacity: usize,
        handoff_timeout: Duration,
        topic: impl Into<String>,
        transport: Arc<dyn EventTransport>,
    ) -> (Self, EventDeliveryWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let publisher = Self {
            tx,
            handoff_timeout,
        };
        let worker = EventDeliveryWorker {
            rx,
            topic: topic.into(),
            transport,
        };
        (publisher, worker)
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish(&self, event: PatientLifecycleEvent) -> Result<(), PublishError> {
        self.tx
            .send_timeout(event, self.handoff_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => PublishError::BufferFull(self.handoff_timeout),
                SendTimeoutError::Closed(_) => PublishError::Closed,
            })
    }
}

/// Background task moving events from the channel to the transport.
pub struct EventDeliveryWorker {
    rx: mpsc::Receiver<PatientLifecycleEvent>,
    topic: String,
    transport: Arc<dyn EventTransport>,
}

impl EventDeliveryWorker {
    /// Deliver events until every publisher is dropped.
    pub async fn run(mut self) {
        tracing::info!("-- Event delivery worker started for topic {}", self.topic);

        while let Some(event) = self.rx.recv().await {
            let key = event.patient_id.to_string();
            match self
                .transport
                .send(&self.topic, &key, event.encode())
                .await
            {
                Ok(()) => tracing::debug!(
                    "delivered {} event for patient {}",
                    event.event_type,
                    key
                ),
                Err(e) => tracing::warn!(
                    "dropping {} event for patient {}: {}",
                    event.event_type,
                    key,
                    e
                ),
            }
        }

        tracing::info!("-- Event delivery worker stopped");
    }
}

/// Transport that only logs events. Used when no broker is configured.
#[derive(Clone, Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl EventTransport for LogTransport {
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        tracing::info!(
            "event for {} on topic {} ({} bytes, no broker configured)",
            key,
            topic,
            payload.len()
        );
        Ok(())
    }
}
