//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransactionFilter, TransactionRepository};

const COLUMNS: &str = "reference_no, partner_reference_no, trx_id, merchant_id, amount, currency, \
     status, transaction_date, paid_date, created_at, updated_at";

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO transactions (
                reference_no, partner_reference_no, trx_id, merchant_id, amount, currency,
                status, transaction_date, paid_date, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&tx.reference_no)
        .bind(&tx.partner_reference_no)
        .bind(&tx.trx_id)
        .bind(&tx.merchant_id)
        .bind(&tx.amount)
        .bind(&tx.currency)
        .bind(tx.status.as_str())
        .bind(tx.transaction_date)
        .bind(tx.paid_date)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn find_by_reference_no(&self, reference_no: &str) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM transactions WHERE reference_no = $1"
        ))
        .bind(reference_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn find_by_partner_reference_no(
        &self,
        partner_reference_no: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM transactions WHERE partner_reference_no = $1"
        ))
        .bind(partner_reference_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn update_status(
        &self,
        reference_no: &str,
        expected: TransactionStatus,
        status: TransactionStatus,
        paid_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE transactions
            SET status = $3, paid_date = $4, updated_at = NOW()
            WHERE reference_no = $1 AND status = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(reference_no)
        .bind(expected.as_str())
        .bind(status.as_str())
        .bind(paid_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn list(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<Transaction>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transactions");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM transactions"));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY transaction_date DESC, reference_no DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let records = rows
            .into_iter()
            .map(TransactionRow::into_domain)
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((records, total))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    builder.push(" WHERE TRUE");

    if let Some(reference_no) = &filter.reference_no {
        builder.push(" AND reference_no = ").push_bind(reference_no.clone());
    }
    if let Some(merchant_id) = &filter.merchant_id {
        builder.push(" AND merchant_id = ").push_bind(merchant_id.clone());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(from) = filter.from {
        builder.push(" AND transaction_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND transaction_date <= ").push_bind(to);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        builder.push(" AND (");
        let mut columns = builder.separated(" OR ");
        for column in ["reference_no", "partner_reference_no", "merchant_id", "trx_id"] {
            columns
                .push(format!("{column} ILIKE "))
                .push_bind_unseparated(pattern.clone())
                .push_unseparated(" ESCAPE '\\'");
        }
        builder.push(")");
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    reference_no: String,
    partner_reference_no: String,
    trx_id: String,
    merchant_id: String,
    amount: bigdecimal::BigDecimal,
    currency: String,
    status: String,
    transaction_date: DateTime<Utc>,
    paid_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let status = self
            .status
            .parse::<TransactionStatus>()
            .map_err(RepositoryError::Corrupt)?;

        Ok(Transaction {
            reference_no: self.reference_no,
            partner_reference_no: self.partner_reference_no,
            trx_id: self.trx_id,
            merchant_id: self.merchant_id,
            amount: self.amount,
            currency: self.currency,
            status,
            transaction_date: self.transaction_date,
            paid_date: self.paid_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
