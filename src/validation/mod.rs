use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::domain::SUPPORTED_CURRENCY;

pub const PARTNER_REFERENCE_MAX_LEN: usize = 128;
pub const MERCHANT_ID_MAX_LEN: usize = 64;
pub const REFERENCE_NO_MAX_LEN: usize = 32;
pub const AMOUNT_INPUT_MAX_LEN: usize = 32;
pub const AMOUNT_MAX_SCALE: i64 = 2;
/// Integer digits that fit the `NUMERIC(20,2)` amount column.
pub const AMOUNT_MAX_INTEGER_DIGITS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Required, bounded identifier such as a merchant id or partner reference.
pub fn validate_identifier(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    validate_required(field, value)?;
    validate_max_len(field, value, max_len)?;

    if value.chars().any(char::is_control) {
        return Err(ValidationError::new(field, "must not contain control characters"));
    }

    Ok(())
}

/// Parses a wire amount such as `"10000.00"`: plain decimal notation, positive,
/// at most two fractional digits and eighteen integer digits.
pub fn parse_amount(value: &str) -> Result<BigDecimal, ValidationError> {
    validate_required("amount.value", value)?;
    validate_max_len("amount.value", value, AMOUNT_INPUT_MAX_LEN)?;

    let well_formed = {
        let digits = value.strip_prefix('-').unwrap_or(value);
        let mut parts = digits.splitn(2, '.');
        let whole = parts.next().unwrap_or("");
        let frac = parts.next();
        !whole.is_empty()
            && whole.chars().all(|c| c.is_ascii_digit())
            && frac.map_or(true, |f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
    };
    if !well_formed {
        return Err(ValidationError::new("amount.value", "must be a decimal number"));
    }

    let whole = value.trim_start_matches('-').split('.').next().unwrap_or(value);
    if whole.trim_start_matches('0').len() > AMOUNT_MAX_INTEGER_DIGITS {
        return Err(ValidationError::new(
            "amount.value",
            format!("must have at most {} integer digits", AMOUNT_MAX_INTEGER_DIGITS),
        ));
    }

    let amount = BigDecimal::from_str(value)
        .map_err(|_| ValidationError::new("amount.value", "must be a decimal number"))?;

    validate_positive_amount(&amount)?;

    let (_, scale) = amount.as_bigint_and_exponent();
    if scale > AMOUNT_MAX_SCALE {
        return Err(ValidationError::new(
            "amount.value",
            format!("must have at most {} decimal places", AMOUNT_MAX_SCALE),
        ));
    }

    Ok(amount)
}

pub fn validate_positive_amount(amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new("amount.value", "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_currency(currency: &str) -> ValidationResult {
    if currency != SUPPORTED_CURRENCY {
        return Err(ValidationError::new(
            "amount.currency",
            format!("only {} currency is supported", SUPPORTED_CURRENCY),
        ));
    }

    Ok(())
}

/// Gateway timestamps carry their offset, e.g. `2025-09-21T09:25:00+07:00`.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ValidationError::new(field, "must be an RFC 3339 timestamp"))
}

/// Start of `YYYY-MM-DD` in UTC.
pub fn parse_start_of_day(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    day_bound(field, value, 0, 0, 0)
}

/// Last second of `YYYY-MM-DD` in UTC, so an end date includes the whole day.
pub fn parse_end_of_day(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    day_bound(field, value, 23, 59, 59)
}

fn day_bound(
    field: &'static str,
    value: &str,
    hour: u32,
    min: u32,
    sec: u32,
) -> Result<DateTime<Utc>, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(hour, min, sec))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| ValidationError::new(field, "invalid date format, use YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn validates_identifier() {
        assert!(validate_identifier("merchantId", "M1", MERCHANT_ID_MAX_LEN).is_ok());
        assert!(validate_identifier("merchantId", "", MERCHANT_ID_MAX_LEN).is_err());
        assert!(validate_identifier("merchantId", "M\u{0007}1", MERCHANT_ID_MAX_LEN).is_err());
        assert!(validate_identifier("merchantId", &"M".repeat(65), MERCHANT_ID_MAX_LEN).is_err());
    }

    #[test]
    fn parses_wire_amounts() {
        assert_eq!(parse_amount("10000.00").unwrap(), BigDecimal::from(10000));
        assert_eq!(parse_amount("10000").unwrap(), BigDecimal::from(10000));
        assert_eq!(parse_amount("0.5").unwrap(), BigDecimal::from_str("0.50").unwrap());
    }

    #[test]
    fn rejects_malformed_amounts() {
        for value in ["", "abc", "1e5", "1,000.00", "10.", ".5", " 10", "NaN", "+5", "1.2.3"] {
            let err = parse_amount(value).unwrap_err();
            assert_eq!(err.field, "amount.value", "value {value:?}");
        }
    }

    #[test]
    fn rejects_non_positive_and_over_precise_amounts() {
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("0.00").is_err());
        assert!(parse_amount("-5.00").is_err());
        assert!(parse_amount("1.005").is_err());
    }

    #[test]
    fn rejects_amounts_wider_than_the_column() {
        let err = parse_amount("1000000000000000000000000.00").unwrap_err();
        assert_eq!(err.field, "amount.value");
        assert!(err.message.contains("integer digits"));
        assert!(parse_amount("1000000000000000000").is_err());

        assert!(parse_amount("999999999999999999.99").is_ok());
        assert!(parse_amount("000000000000000000001.00").is_ok());
    }

    #[test]
    fn validates_currency() {
        assert!(validate_currency("IDR").is_ok());
        assert!(validate_currency("USD").is_err());
        assert!(validate_currency("idr").is_err());
    }

    #[test]
    fn parses_timezone_aware_timestamps() {
        let ts = parse_timestamp("paidTime", "2025-09-21T09:25:00+07:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 9, 21, 2, 25, 0).unwrap());
        assert!(parse_timestamp("paidTime", "2025-09-21 09:25:00").is_err());
        assert!(parse_timestamp("paidTime", "2025-09-21T09:25:00").is_err());
    }

    #[test]
    fn parses_day_bounds() {
        let start = parse_start_of_day("startDate", "2025-09-21").unwrap();
        let end = parse_end_of_day("endDate", "2025-09-21").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 9, 21, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 9, 21, 23, 59, 59).unwrap());
        assert!(parse_start_of_day("startDate", "21-09-2025").is_err());
    }
}
