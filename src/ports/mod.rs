//! Storage port for transactions.
//! The engine depends on this trait only; adapters live in `crate::adapters`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Transaction, TransactionStatus};

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// A unique constraint rejected the write. Carries the constraint name when known.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return RepositoryError::UniqueViolation(constraint);
            }
        }
        RepositoryError::Database(err)
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Already-validated list filters. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub reference_no: Option<String>,
    pub merchant_id: Option<String>,
    pub status: Option<TransactionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring over reference, partner reference, merchant and trx id.
    pub search: Option<String>,
}

impl TransactionFilter {
    /// In-process evaluation of the filter, mirroring the SQL `WHERE` clause.
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(reference_no) = &self.reference_no {
            if &tx.reference_no != reference_no {
                return false;
            }
        }
        if let Some(merchant_id) = &self.merchant_id {
            if &tx.merchant_id != merchant_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if tx.status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if tx.transaction_date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if tx.transaction_date > to {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [
                &tx.reference_no,
                &tx.partner_reference_no,
                &tx.merchant_id,
                &tx.trx_id,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction>;

    async fn find_by_reference_no(&self, reference_no: &str) -> RepositoryResult<Option<Transaction>>;

    async fn find_by_partner_reference_no(
        &self,
        partner_reference_no: &str,
    ) -> RepositoryResult<Option<Transaction>>;

    /// Moves `reference_no` from `expected` to `status` and records `paid_at`.
    /// Returns `None` when the row is missing or no longer in `expected`.
    async fn update_status(
        &self,
        reference_no: &str,
        expected: TransactionStatus,
        status: TransactionStatus,
        paid_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Transaction>>;

    /// Returns one page of matches, newest first, plus the total match count.
    async fn list(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<Transaction>, i64)>;

    async fn ping(&self) -> RepositoryResult<()>;
}
