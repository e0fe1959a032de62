//! Document number generation.
//!
//! Every issued document (order, PO, invoice, payment, delivery note,
//! swap) carries a human-readable unique number. Numbers embed the issue
//! date plus a short random suffix; uniqueness is ultimately enforced by
//! the database constraint on the number column.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const ORDER_PREFIX: &str = "ORD";
pub const PURCHASE_ORDER_PREFIX: &str = "PO";
pub const INVOICE_PREFIX: &str = "INV";
pub const PAYMENT_PREFIX: &str = "PAY";
pub const DELIVERY_NOTE_PREFIX: &str = "SJ";
pub const SWAP_PREFIX: &str = "SWP";

/// `PREFIX-YYYYMMDD-XXXXXX` with an uppercase hex suffix.
pub fn document_number(prefix: &str, issued_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        issued_at.format("%Y%m%d"),
        suffix[..6].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_carry_prefix_and_date() {
        let issued_at = "2024-06-15T08:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let number = document_number(INVOICE_PREFIX, issued_at);
        assert!(number.starts_with("INV-20240615-"), "{}", number);
        assert_eq!(number.len(), "INV-20240615-".len() + 6);
    }

    #[test]
    fn consecutive_numbers_differ() {
        let now = Utc::now();
        let a = document_number(ORDER_PREFIX, now);
        let b = document_number(ORDER_PREFIX, now);
        assert_ne!(a, b);
    }
}
