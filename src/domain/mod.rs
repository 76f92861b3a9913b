pub mod transaction;

pub use transaction::{Transaction, TransactionStatus, SUPPORTED_CURRENCY};
