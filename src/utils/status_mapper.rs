//! Gateway status vocabulary to canonical [`TransactionStatus`].
//!
//! Matching is case-sensitive and limited to a closed set of labels.

use crate::domain::TransactionStatus;

const STATUS_LABELS: &[(&str, TransactionStatus)] = &[
    ("Success", TransactionStatus::Paid),
    ("SUCCESS", TransactionStatus::Paid),
    ("Paid", TransactionStatus::Paid),
    ("PAID", TransactionStatus::Paid),
    ("Failed", TransactionStatus::Failed),
    ("FAILED", TransactionStatus::Failed),
    ("Pending", TransactionStatus::Pending),
    ("PENDING", TransactionStatus::Pending),
    ("Expired", TransactionStatus::Expired),
    ("EXPIRED", TransactionStatus::Expired),
];

/// Strict lookup: `None` for anything outside the vocabulary.
pub fn parse_status(label: &str) -> Option<TransactionStatus> {
    STATUS_LABELS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, status)| *status)
}

/// Total mapping used for callbacks: unknown labels fall back to `Pending`.
pub fn map_status(label: &str) -> TransactionStatus {
    parse_status(label).unwrap_or(TransactionStatus::Pending)
}
