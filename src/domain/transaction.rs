//! Transaction domain entity.
//! Framework-agnostic representation of a QR payment transaction.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// The only currency QR payments are issued in.
pub const SUPPORTED_CURRENCY: &str = "IDR";

/// Prefix of the internal transaction id derived from the partner reference.
pub const TRX_ID_PREFIX: &str = "TRX-";

/// Canonical transaction status.
///
/// `Pending` is the only initial state. The other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Pending,
    Paid,
    Failed,
    Expired,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Paid => "PAID",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the canonical (stored) spelling only. Gateway vocabulary goes through
/// [`crate::utils::status_mapper`].
impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "PAID" => Ok(TransactionStatus::Paid),
            "FAILED" => Ok(TransactionStatus::Failed),
            "EXPIRED" => Ok(TransactionStatus::Expired),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// Domain entity representing a QR payment transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub reference_no: String,
    pub partner_reference_no: String,
    pub trx_id: String,
    pub merchant_id: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub transaction_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a fresh PENDING transaction for a first issuance request.
    pub fn new_pending(
        reference_no: String,
        partner_reference_no: String,
        merchant_id: String,
        amount: BigDecimal,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            trx_id: trx_id_for(&partner_reference_no),
            reference_no,
            partner_reference_no,
            merchant_id,
            amount,
            currency,
            status: TransactionStatus::Pending,
            transaction_date: now,
            paid_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn trx_id_for(partner_reference_no: &str) -> String {
    format!("{}{}", TRX_ID_PREFIX, partner_reference_no)
}
