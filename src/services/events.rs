//! Domain events emitted by the transaction engine and their delivery to the hub.
//!
//! The engine only ever calls [`EventPublisher::publish`], which never blocks and never fails.
//! A separate dispatcher task turns events into realtime envelopes.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::Transaction;
use crate::schemas::TransactionSchema;
use crate::services::hub::HubHandle;

pub const EVENT_QUEUE_CAPACITY: usize = 1024;
pub const TRANSACTION_UPDATE: &str = "TRANSACTION_UPDATE";

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionEvent {
    /// A reconciliation changed the stored status. Carries the record as persisted.
    Updated(Transaction),
}

/// Wire shape pushed to realtime observers.
#[derive(Debug, Serialize)]
pub struct RealtimeEnvelope {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: TransactionSchema,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl TransactionEvent {
    pub fn to_envelope_json(&self) -> serde_json::Result<String> {
        match self {
            TransactionEvent::Updated(tx) => serde_json::to_string(&RealtimeEnvelope {
                kind: TRANSACTION_UPDATE,
                data: TransactionSchema::from(tx),
                timestamp: Utc::now().timestamp(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EventPublisher {
    sender: mpsc::Sender<TransactionEvent>,
}

impl EventPublisher {
    pub fn publish(&self, event: TransactionEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(?event, "Event queue full, realtime update dropped");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(?event, "Event dispatcher not running, realtime update dropped");
            }
        }
    }
}

pub fn event_channel(capacity: usize) -> (EventPublisher, mpsc::Receiver<TransactionEvent>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (EventPublisher { sender }, receiver)
}

/// Forwards engine events to the hub until every publisher is dropped.
pub fn spawn_dispatcher(
    mut events: mpsc::Receiver<TransactionEvent>,
    hub: HubHandle,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let json = match event.to_envelope_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize realtime update: {}", e);
                    continue;
                }
            };

            let TransactionEvent::Updated(tx) = &event;
            match hub.broadcast(json).await {
                Ok(()) => tracing::info!(
                    reference_no = %tx.reference_no,
                    status = %tx.status,
                    "Broadcast transaction update"
                ),
                Err(e) => tracing::warn!(
                    reference_no = %tx.reference_no,
                    "Realtime update not delivered: {}", e
                ),
            }
        }
        tracing::debug!("Event dispatcher stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionStatus;
    use crate::services::hub::spawn_hub;

    fn paid() -> Transaction {
        let mut tx = Transaction::new_pending(
            "A0000000577".to_string(),
            "P1".to_string(),
            "M1".to_string(),
            "10000.00".parse().unwrap(),
            "IDR".to_string(),
        );
        tx.status = TransactionStatus::Paid;
        tx.paid_date = Some(Utc::now());
        tx
    }

    #[test]
    fn envelope_has_type_data_and_timestamp() {
        let json = TransactionEvent::Updated(paid()).to_envelope_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "TRANSACTION_UPDATE");
        assert_eq!(value["data"]["reference_no"], "A0000000577");
        assert_eq!(value["data"]["status"], "PAID");
        assert!(value["data"]["paid_date"].is_string());
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn publish_never_blocks_when_queue_is_full() {
        let (publisher, mut receiver) = event_channel(1);
        publisher.publish(TransactionEvent::Updated(paid()));
        publisher.publish(TransactionEvent::Updated(paid()));

        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn publish_after_dispatcher_gone_is_swallowed() {
        let (publisher, receiver) = event_channel(4);
        drop(receiver);
        publisher.publish(TransactionEvent::Updated(paid()));
    }

    #[tokio::test]
    async fn dispatcher_delivers_envelopes_to_observers() {
        let (hub, _hub_task) = spawn_hub(8);
        let mut observer = hub.register().await.unwrap();
        let (publisher, receiver) = event_channel(8);
        let dispatcher = spawn_dispatcher(receiver, hub.clone());

        publisher.publish(TransactionEvent::Updated(paid()));

        let message = observer.messages.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&message).unwrap();
        assert_eq!(value["type"], "TRANSACTION_UPDATE");
        assert_eq!(value["data"]["partner_reference_no"], "P1");

        drop(publisher);
        dispatcher.await.unwrap();
    }
}
