//! QRIS-style QR content for an issued transaction.
//!
//! Content depends on `(merchant_id, reference_no)` only, so re-issuing an existing
//! transaction reproduces the same bytes.

const QR_HEAD: &str = "00020101021226620015ID.CO.MANJO.WWW01189360085801751859910210";
const QR_MERCHANT_TAIL: &str = "0303UMI51530014ID.CO.QRIS.WWW0215ID102106515192304121.0.21.09.255204481653033605502015802ID5904OLDI6013JAKARTA BARAT61051147062460525";
const QR_TRAILER: &str = "07031110806'ASPI663040FAD";

pub fn qr_content(merchant_id: &str, reference_no: &str) -> String {
    let mut content = String::with_capacity(
        QR_HEAD.len() + merchant_id.len() + QR_MERCHANT_TAIL.len() + reference_no.len() + QR_TRAILER.len(),
    );
    content.push_str(QR_HEAD);
    content.push_str(merchant_id);
    content.push_str(QR_MERCHANT_TAIL);
    content.push_str(reference_no);
    content.push_str(QR_TRAILER);
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        assert_eq!(qr_content("M1", "A0000000577"), qr_content("M1", "A0000000577"));
    }

    #[test]
    fn embeds_merchant_and_reference() {
        let content = qr_content("M1", "A0000000577");
        assert!(content.starts_with(QR_HEAD));
        assert!(content.contains("0210M10303UMI"));
        assert!(content.contains("0525A000000057707031110806"));
        assert!(content.ends_with(QR_TRAILER));
    }

    #[test]
    fn differs_per_reference() {
        assert_ne!(qr_content("M1", "A0000000001"), qr_content("M1", "A0000000002"));
        assert_ne!(qr_content("M1", "A0000000001"), qr_content("M2", "A0000000001"));
    }
}
