//! In-memory implementation of TransactionRepository.
//! Enforces the same unique constraints as the `transactions` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransactionFilter, TransactionRepository};

#[derive(Default)]
pub struct InMemoryTransactionRepository {
    // keyed by reference_no
    rows: RwLock<HashMap<String, Transaction>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let mut rows = self.rows.write().await;

        if rows.contains_key(&tx.reference_no) {
            return Err(RepositoryError::UniqueViolation(
                "transactions_reference_no_key".to_string(),
            ));
        }
        for existing in rows.values() {
            if existing.partner_reference_no == tx.partner_reference_no {
                return Err(RepositoryError::UniqueViolation(
                    "transactions_partner_reference_no_key".to_string(),
                ));
            }
            if existing.trx_id == tx.trx_id {
                return Err(RepositoryError::UniqueViolation(
                    "transactions_trx_id_key".to_string(),
                ));
            }
        }

        rows.insert(tx.reference_no.clone(), tx.clone());
        Ok(tx.clone())
    }

    async fn find_by_reference_no(&self, reference_no: &str) -> RepositoryResult<Option<Transaction>> {
        Ok(self.rows.read().await.get(reference_no).cloned())
    }

    async fn find_by_partner_reference_no(
        &self,
        partner_reference_no: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|tx| tx.partner_reference_no == partner_reference_no)
            .cloned())
    }

    async fn update_status(
        &self,
        reference_no: &str,
        expected: TransactionStatus,
        status: TransactionStatus,
        paid_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Transaction>> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(reference_no) {
            Some(tx) if tx.status == expected => {
                tx.status = status;
                tx.paid_date = Some(paid_at);
                tx.updated_at = Utc::now();
                Ok(Some(tx.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<Transaction>, i64)> {
        let rows = self.rows.read().await;
        let mut matched: Vec<&Transaction> = rows.values().filter(|tx| filter.matches(tx)).collect();
        matched.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then_with(|| b.reference_no.cmp(&a.reference_no))
        });

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(reference_no: &str, partner: &str) -> Transaction {
        Transaction::new_pending(
            reference_no.to_string(),
            partner.to_string(),
            "M1".to_string(),
            "10000.00".parse().expect("valid decimal"),
            "IDR".to_string(),
        )
    }

    #[tokio::test]
    async fn rejects_duplicate_partner_reference() {
        let repo = InMemoryTransactionRepository::new();
        repo.insert(&pending("A1", "P1")).await.unwrap();

        let err = repo.insert(&pending("A2", "P1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn rejects_duplicate_reference_no() {
        let repo = InMemoryTransactionRepository::new();
        repo.insert(&pending("A1", "P1")).await.unwrap();

        let err = repo.insert(&pending("A1", "P2")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation(c) if c.contains("reference_no")));
    }

    #[tokio::test]
    async fn conditional_update_only_applies_from_expected_status() {
        let repo = InMemoryTransactionRepository::new();
        repo.insert(&pending("A1", "P1")).await.unwrap();
        let now = Utc::now();

        let updated = repo
            .update_status("A1", TransactionStatus::Pending, TransactionStatus::Paid, now)
            .await
            .unwrap()
            .expect("row updated");
        assert_eq!(updated.status, TransactionStatus::Paid);
        assert_eq!(updated.paid_date, Some(now));

        let second = repo
            .update_status("A1", TransactionStatus::Pending, TransactionStatus::Failed, now)
            .await
            .unwrap();
        assert!(second.is_none());

        let missing = repo
            .update_status("A9", TransactionStatus::Pending, TransactionStatus::Paid, now)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn list_paginates_and_counts_all_matches() {
        let repo = InMemoryTransactionRepository::new();
        for i in 0..5 {
            repo.insert(&pending(&format!("A{i}"), &format!("P{i}")))
                .await
                .unwrap();
        }

        let (page, total) = repo.list(&TransactionFilter::default(), 2, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);

        let (page, total) = repo.list(&TransactionFilter::default(), 10, 4).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 1);
    }
}
