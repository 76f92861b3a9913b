//! Realtime fan-out hub.
//!
//! One coordinator task owns the observer set. Everything else talks to it through
//! [`HubHandle`], which only sends commands into the coordinator's queue.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const DEFAULT_OBSERVER_QUEUE_CAPACITY: usize = 256;
const COMMAND_QUEUE_CAPACITY: usize = 1024;

pub type ObserverId = Uuid;

/// A serialized broadcast payload shared by every observer queue.
pub type HubMessage = Arc<str>;

#[derive(Debug, thiserror::Error)]
#[error("realtime hub is not running")]
pub struct HubClosed;

enum HubCommand {
    Register {
        id: ObserverId,
        queue: mpsc::Sender<HubMessage>,
    },
    Unregister(ObserverId),
    Broadcast(HubMessage),
    ObserverCount(oneshot::Sender<usize>),
}

/// Cloneable entry point to the hub coordinator.
#[derive(Clone, Debug)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    observer_queue_capacity: usize,
}

/// Receiving end of one observer's outbound queue. Yields `None` once the hub drops it.
pub struct Subscription {
    pub id: ObserverId,
    pub messages: mpsc::Receiver<HubMessage>,
}

impl HubHandle {
    /// Registers a new observer with a bounded outbound queue.
    pub async fn register(&self) -> Result<Subscription, HubClosed> {
        let id = Uuid::new_v4();
        let (queue, messages) = mpsc::channel(self.observer_queue_capacity);
        self.commands
            .send(HubCommand::Register { id, queue })
            .await
            .map_err(|_| HubClosed)?;
        Ok(Subscription { id, messages })
    }

    /// Removes an observer and closes its queue. Unknown ids are ignored.
    pub async fn unregister(&self, id: ObserverId) -> Result<(), HubClosed> {
        self.commands
            .send(HubCommand::Unregister(id))
            .await
            .map_err(|_| HubClosed)
    }

    /// Queues `message` for fan-out to every registered observer.
    pub async fn broadcast(&self, message: impl Into<HubMessage>) -> Result<(), HubClosed> {
        self.commands
            .send(HubCommand::Broadcast(message.into()))
            .await
            .map_err(|_| HubClosed)
    }

    pub async fn observer_count(&self) -> Result<usize, HubClosed> {
        let (reply, count) = oneshot::channel();
        self.commands
            .send(HubCommand::ObserverCount(reply))
            .await
            .map_err(|_| HubClosed)?;
        count.await.map_err(|_| HubClosed)
    }
}

/// Starts the coordinator. It runs until every [`HubHandle`] is dropped.
pub fn spawn_hub(observer_queue_capacity: usize) -> (HubHandle, JoinHandle<()>) {
    let (commands, inbox) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let handle = HubHandle {
        commands,
        observer_queue_capacity: observer_queue_capacity.max(1),
    };
    let task = tokio::spawn(Hub::default().run(inbox));
    (handle, task)
}

#[derive(Default)]
struct Hub {
    observers: HashMap<ObserverId, mpsc::Sender<HubMessage>>,
}

impl Hub {
    async fn run(mut self, mut inbox: mpsc::Receiver<HubCommand>) {
        tracing::info!("Realtime hub started");
        while let Some(command) = inbox.recv().await {
            match command {
                HubCommand::Register { id, queue } => self.register(id, queue),
                HubCommand::Unregister(id) => self.unregister(id),
                HubCommand::Broadcast(message) => self.broadcast(message),
                HubCommand::ObserverCount(reply) => {
                    let _ = reply.send(self.observers.len());
                }
            }
        }
        tracing::info!(
            observers = self.observers.len(),
            "Realtime hub stopped"
        );
    }

    fn register(&mut self, id: ObserverId, queue: mpsc::Sender<HubMessage>) {
        self.observers.insert(id, queue);
        tracing::info!(observer_id = %id, total = self.observers.len(), "Observer registered");
    }

    fn unregister(&mut self, id: ObserverId) {
        // dropping the sender closes the observer's queue
        if self.observers.remove(&id).is_some() {
            tracing::info!(observer_id = %id, total = self.observers.len(), "Observer unregistered");
        }
    }

    fn broadcast(&mut self, message: HubMessage) {
        let before = self.observers.len();
        self.observers.retain(|id, queue| match queue.try_send(Arc::clone(&message)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(observer_id = %id, "Observer queue full, dropping observer");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(observer_id = %id, "Observer queue closed, dropping observer");
                false
            }
        });
        tracing::debug!(
            delivered = self.observers.len(),
            dropped = before - self.observers.len(),
            "Broadcast fanned out"
        );
    }
}
