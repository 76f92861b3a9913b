//! QR issuance, callback reconciliation and listing.
//!
//! Persistence is authoritative: the engine writes through the repository first and only
//! then emits a [`TransactionEvent`]. Failure kinds are [`EngineError`] variants and are
//! never recovered from message text.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{RepositoryError, TransactionFilter, TransactionRepository};
use crate::services::events::{EventPublisher, TransactionEvent};
use crate::utils::qr::qr_content;
use crate::utils::reference::ReferenceGenerator;
use crate::utils::status_mapper::{map_status, parse_status};
use crate::validation::{
    self, parse_amount, parse_end_of_day, parse_start_of_day, parse_timestamp, validate_currency,
    validate_identifier, ValidationError,
};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Insert attempts before giving up on reference number collisions.
const MAX_REFERENCE_ATTEMPTS: usize = 5;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// Lost an issuance race for the same partner reference.
    #[error("transaction with partner reference {0} already exists")]
    DuplicateReference(String),

    #[error("transaction {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Mismatch(String),

    #[error("transaction {reference_no} is already {current}, cannot become {requested}")]
    AlreadyResolved {
        reference_no: String,
        current: TransactionStatus,
        requested: TransactionStatus,
    },

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl EngineError {
    fn format(err: ValidationError) -> Self {
        EngineError::InvalidFormat(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub merchant_id: String,
    pub partner_reference_no: String,
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct IssueOutcome {
    pub reference_no: String,
    pub partner_reference_no: String,
    pub qr_content: String,
    /// False when an existing transaction was returned for a repeated request.
    pub created: bool,
    pub transaction: Transaction,
}

#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub original_reference_no: String,
    pub original_partner_reference_no: String,
    pub amount: String,
    pub currency: String,
    pub status_desc: String,
    pub paid_time: String,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The caller's own wording, echoed back unchanged.
    pub status_desc: String,
    pub changed: bool,
    pub transaction: Transaction,
}

/// Raw list parameters as received. Empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub reference_number: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_page: i64,
}

#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub records: Vec<Transaction>,
    pub pagination: Pagination,
}

pub struct TransactionEngine {
    repository: Arc<dyn TransactionRepository>,
    references: ReferenceGenerator,
    events: EventPublisher,
}

impl TransactionEngine {
    pub fn new(
        repository: Arc<dyn TransactionRepository>,
        references: ReferenceGenerator,
        events: EventPublisher,
    ) -> Self {
        Self {
            repository,
            references,
            events,
        }
    }

    pub fn repository(&self) -> &Arc<dyn TransactionRepository> {
        &self.repository
    }

    pub async fn issue(&self, req: IssueRequest) -> Result<IssueOutcome, EngineError> {
        validate_identifier("merchantId", &req.merchant_id, validation::MERCHANT_ID_MAX_LEN)
            .map_err(EngineError::format)?;
        validate_identifier(
            "partnerReferenceNo",
            &req.partner_reference_no,
            validation::PARTNER_REFERENCE_MAX_LEN,
        )
        .map_err(EngineError::format)?;
        let amount =
            parse_amount(&req.amount).map_err(|e| EngineError::InvalidAmount(e.to_string()))?;
        validate_currency(&req.currency)
            .map_err(|e| EngineError::UnsupportedCurrency(e.to_string()))?;

        if let Some(existing) = self
            .repository
            .find_by_partner_reference_no(&req.partner_reference_no)
            .await?
        {
            tracing::debug!(
                reference_no = %existing.reference_no,
                partner_reference_no = %existing.partner_reference_no,
                "Returning existing transaction for repeated issuance"
            );
            return Ok(issued(existing, false));
        }

        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let tx = Transaction::new_pending(
                self.references.next_reference(),
                req.partner_reference_no.clone(),
                req.merchant_id.clone(),
                amount.clone(),
                req.currency.clone(),
            );

            match self.repository.insert(&tx).await {
                Ok(inserted) => {
                    tracing::info!(
                        reference_no = %inserted.reference_no,
                        partner_reference_no = %inserted.partner_reference_no,
                        merchant_id = %inserted.merchant_id,
                        "QR transaction issued"
                    );
                    return Ok(issued(inserted, true));
                }
                Err(RepositoryError::UniqueViolation(constraint)) => {
                    // The constraint is the source of truth; the pre-check above can race.
                    if self
                        .repository
                        .find_by_partner_reference_no(&req.partner_reference_no)
                        .await?
                        .is_some()
                    {
                        tracing::warn!(
                            partner_reference_no = %req.partner_reference_no,
                            "Concurrent issuance for the same partner reference"
                        );
                        return Err(EngineError::DuplicateReference(req.partner_reference_no));
                    }
                    tracing::warn!(
                        attempt,
                        constraint = %constraint,
                        reference_no = %tx.reference_no,
                        "Reference number collision, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::Storage(RepositoryError::UniqueViolation(
            "transactions_reference_no_key".to_string(),
        )))
    }

    pub async fn reconcile(&self, req: ReconcileRequest) -> Result<ReconcileOutcome, EngineError> {
        validate_identifier(
            "originalReferenceNo",
            &req.original_reference_no,
            validation::REFERENCE_NO_MAX_LEN,
        )
        .map_err(EngineError::format)?;
        validate_identifier(
            "originalPartnerReferenceNo",
            &req.original_partner_reference_no,
            validation::PARTNER_REFERENCE_MAX_LEN,
        )
        .map_err(EngineError::format)?;
        let amount = parse_amount(&req.amount).map_err(EngineError::format)?;
        validate_currency(&req.currency)
            .map_err(|e| EngineError::UnsupportedCurrency(e.to_string()))?;
        let paid_at = parse_timestamp("paidTime", &req.paid_time).map_err(EngineError::format)?;

        let mut current = self
            .repository
            .find_by_reference_no(&req.original_reference_no)
            .await?
            .ok_or_else(|| EngineError::NotFound(req.original_reference_no.clone()))?;

        if current.partner_reference_no != req.original_partner_reference_no {
            return Err(EngineError::Mismatch(
                "partner reference number mismatch".to_string(),
            ));
        }
        if current.amount != amount {
            return Err(EngineError::Mismatch("amount mismatch".to_string()));
        }

        let target = map_status(&req.status_desc);

        // Terminal states never move, so a lost conditional update settles on the re-read.
        loop {
            if current.status == target {
                tracing::debug!(
                    reference_no = %current.reference_no,
                    status = %target,
                    "Callback repeats stored status, nothing to do"
                );
                return Ok(ReconcileOutcome {
                    status_desc: req.status_desc,
                    changed: false,
                    transaction: current,
                });
            }

            if current.status.is_terminal() {
                return Err(EngineError::AlreadyResolved {
                    reference_no: current.reference_no,
                    current: current.status,
                    requested: target,
                });
            }

            match self
                .repository
                .update_status(&current.reference_no, current.status, target, paid_at)
                .await?
            {
                Some(updated) => {
                    tracing::info!(
                        reference_no = %updated.reference_no,
                        from = %current.status,
                        to = %updated.status,
                        "Transaction status updated"
                    );
                    self.events.publish(TransactionEvent::Updated(updated.clone()));
                    return Ok(ReconcileOutcome {
                        status_desc: req.status_desc,
                        changed: true,
                        transaction: updated,
                    });
                }
                None => {
                    current = self
                        .repository
                        .find_by_reference_no(&req.original_reference_no)
                        .await?
                        .ok_or_else(|| EngineError::NotFound(req.original_reference_no.clone()))?;
                }
            }
        }
    }

    pub async fn list(&self, query: ListQuery) -> Result<TransactionPage, EngineError> {
        let status = match non_empty(query.status) {
            Some(label) => Some(
                parse_status(&label).ok_or_else(|| EngineError::InvalidStatus(label.clone()))?,
            ),
            None => None,
        };
        let from = non_empty(query.start_date)
            .map(|d| parse_start_of_day("startDate", &d))
            .transpose()
            .map_err(EngineError::format)?;
        let to = non_empty(query.end_date)
            .map(|d| parse_end_of_day("endDate", &d))
            .transpose()
            .map_err(EngineError::format)?;

        let filter = TransactionFilter {
            reference_no: non_empty(query.reference_number),
            merchant_id: non_empty(query.customer_id),
            status,
            from,
            to,
            search: non_empty(query.search),
        };

        let page = query.page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
        let limit = query
            .limit
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        let offset = (page - 1).saturating_mul(limit);

        let (records, total) = self.repository.list(&filter, limit, offset).await?;

        Ok(TransactionPage {
            records,
            pagination: Pagination {
                page,
                limit,
                total,
                total_page: (total + limit - 1) / limit,
            },
        })
    }
}

fn issued(tx: Transaction, created: bool) -> IssueOutcome {
    IssueOutcome {
        qr_content: qr_content(&tx.merchant_id, &tx.reference_no),
        reference_no: tx.reference_no.clone(),
        partner_reference_no: tx.partner_reference_no.clone(),
        created,
        transaction: tx,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTransactionRepository;
    use crate::services::events::event_channel;

    fn engine() -> TransactionEngine {
        let (events, _receiver) = event_channel(16);
        TransactionEngine::new(
            Arc::new(InMemoryTransactionRepository::new()),
            ReferenceGenerator::default(),
            events,
        )
    }

    fn issue_request(currency: &str) -> IssueRequest {
        IssueRequest {
            merchant_id: "M1".to_string(),
            partner_reference_no: "P1".to_string(),
            amount: "10000.00".to_string(),
            currency: currency.to_string(),
        }
    }

    #[test]
    fn blank_values_are_absent() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(" PAID ".to_string())), Some("PAID".to_string()));
    }

    #[tokio::test]
    async fn rejects_unsupported_currency() {
        let err = engine().issue(issue_request("USD")).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedCurrency(_)));
    }

    #[tokio::test]
    async fn rejects_bad_amount() {
        let mut req = issue_request("IDR");
        req.amount = "-1".to_string();
        let err = engine().issue(req).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn rejects_blank_partner_reference() {
        let mut req = issue_request("IDR");
        req.partner_reference_no = " ".to_string();
        let err = engine().issue(req).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn list_rejects_unknown_status_and_bad_dates() {
        let engine = engine();
        let err = engine
            .list(ListQuery {
                status: Some("Refunded".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidStatus(s) if s == "Refunded"));

        let err = engine
            .list(ListQuery {
                start_date: Some("2025/09/21".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn list_clamps_page_and_limit() {
        let page = engine()
            .list(ListQuery {
                page: Some(0),
                limit: Some(1_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            page.pagination,
            Pagination {
                page: 1,
                limit: 100,
                total: 0,
                total_page: 0
            }
        );
    }
}
