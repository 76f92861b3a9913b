//! Wire shapes of the public API.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Transaction;
use crate::services::transaction_engine::Pagination;

pub const QR_GENERATE_SUCCESS_CODE: &str = "2004700";
pub const QR_PAYMENT_SUCCESS_CODE: &str = "2005100";
pub const LIST_SUCCESS_CODE: &str = "200";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Amount {
    #[schema(example = "10000.00")]
    pub value: String,
    #[schema(example = "IDR")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrRequest {
    pub partner_reference_no: String,
    pub merchant_id: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrResponse {
    pub response_code: String,
    pub response_message: String,
    pub reference_no: String,
    pub partner_reference_no: String,
    pub qr_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallbackRequest {
    pub original_reference_no: String,
    pub original_partner_reference_no: String,
    #[schema(example = "Success")]
    pub transaction_status_desc: String,
    #[schema(example = "2025-09-21T10:00:00+07:00")]
    pub paid_time: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallbackResponse {
    pub response_code: String,
    pub response_message: String,
    pub transaction_status_desc: String,
}

/// A stored transaction as exposed by the list endpoint and realtime updates.
///
/// Records keep the snake_case field names dashboards already consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionSchema {
    pub reference_no: String,
    pub partner_reference_no: String,
    pub trx_id: String,
    pub merchant_id: String,
    #[schema(example = "10000.00")]
    pub amount: String,
    pub currency: String,
    #[schema(example = "PENDING")]
    pub status: String,
    pub transaction_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionSchema {
    fn from(tx: &Transaction) -> Self {
        Self {
            reference_no: tx.reference_no.clone(),
            partner_reference_no: tx.partner_reference_no.clone(),
            trx_id: tx.trx_id.clone(),
            merchant_id: tx.merchant_id.clone(),
            amount: format_amount(&tx.amount),
            currency: tx.currency.clone(),
            status: tx.status.as_str().to_string(),
            transaction_date: tx.transaction_date,
            paid_date: tx.paid_date,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

/// Amounts always leave the service with exactly two fraction digits.
pub fn format_amount(amount: &BigDecimal) -> String {
    amount.with_scale(2).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListResponse {
    pub response_code: String,
    pub response_message: String,
    pub data: Vec<TransactionSchema>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[schema(example = 400)]
    pub response_code: u16,
    pub response_message: String,
}
