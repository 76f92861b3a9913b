pub mod events;
pub mod hub;
pub mod transaction_engine;

pub use events::{event_channel, spawn_dispatcher, EventPublisher, TransactionEvent};
pub use hub::{spawn_hub, HubHandle};
pub use transaction_engine::{EngineError, TransactionEngine};
