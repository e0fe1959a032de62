//! Status machines for the order-to-cash chain.
//!
//! Statuses are stored as plain strings; this module owns the typed enums,
//! the parsing, and the transition tables. Every service mutation that
//! changes a status goes through [`ensure_transition`] so an invalid jump
//! is rejected with an error naming both states.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Customer order lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PendingConfirmation,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (*self, to) {
            (New, PendingConfirmation) => true,
            (New, Processing) => true,
            (PendingConfirmation, Processing) => true,
            (Processing, Completed) => true,

            // Any non-terminal order can be cancelled
            (from, Cancelled) if !from.is_terminal() => true,

            _ => false,
        }
    }
}

/// Internal fulfillment record derived from a confirmed order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Pending,
    Processing,
    ReadyForDelivery,
    Completed,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Completed | PurchaseOrderStatus::Cancelled
        )
    }

    /// An invoice may only be generated once the PO has left PENDING.
    pub fn allows_invoicing(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Processing | PurchaseOrderStatus::ReadyForDelivery
        )
    }

    pub fn can_transition_to(&self, to: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;
        match (*self, to) {
            (Pending, Processing) => true,
            (Processing, ReadyForDelivery) => true,
            (ReadyForDelivery, Completed) => true,

            (from, Cancelled) if !from.is_terminal() => true,

            _ => false,
        }
    }
}

/// Invoice lifecycle. OVERDUE is never persisted; it is layered over
/// SENT/DELIVERED at read time by [`effective_invoice_status`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Delivered,
    Paid,
    Completed,
    Overdue,
    Cancelled,
    Returned,
}

impl InvoiceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Completed | InvoiceStatus::Cancelled | InvoiceStatus::Returned
        )
    }

    /// True for statuses that may be written to the database.
    pub fn is_stored(&self) -> bool {
        !matches!(self, InvoiceStatus::Overdue)
    }

    pub fn can_transition_to(&self, to: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        match (*self, to) {
            // OVERDUE is computed, never a transition target or source
            (Overdue, _) | (_, Overdue) => false,

            (Draft, Sent) => true,
            (Sent, Delivered) => true,
            (Sent, Paid) => true,
            (Delivered, Paid) => true,
            (Paid, Completed) => true,

            (from, Cancelled) if !from.is_terminal() => true,
            (from, Returned) if !from.is_terminal() => true,

            _ => false,
        }
    }
}

/// Derived payment-settlement state of an invoice.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoicePaymentStatus {
    Unpaid,
    Paid,
    Overpaid,
}

impl InvoicePaymentStatus {
    /// Recomputed whenever `paid_amount` changes. Short payments leave the
    /// invoice UNPAID; `remaining_amount` carries the shortfall.
    pub fn from_amounts(paid_amount: Decimal, total_amount: Decimal) -> Self {
        if paid_amount > total_amount {
            InvoicePaymentStatus::Overpaid
        } else if paid_amount == total_amount && total_amount > Decimal::ZERO {
            InvoicePaymentStatus::Paid
        } else {
            InvoicePaymentStatus::Unpaid
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Cleared,
    Rejected,
}

impl PaymentStatus {
    pub fn can_transition_to(&self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match (*self, to) {
            (Pending, Cleared) => true,
            (Pending, Rejected) => true,
            // A cleared payment can bounce; the applied amount is reversed
            (Cleared, Rejected) => true,
            _ => false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryNoteStatus {
    Pending,
    Delivered,
    Cancelled,
}

impl DeliveryNoteStatus {
    pub fn can_transition_to(&self, to: DeliveryNoteStatus) -> bool {
        use DeliveryNoteStatus::*;
        matches!(
            (*self, to),
            (Pending, Delivered) | (Pending, Cancelled)
        )
    }
}

/// Whether an invoice bills goods or services. Delivery notes exist only
/// for PRODUCT invoices.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    Product,
    Service,
}

/// Parses a stored status string into its typed enum.
pub fn parse_status<T>(value: &str) -> Result<T, ServiceError>
where
    T: FromStr,
{
    T::from_str(value)
        .map_err(|_| ServiceError::InvalidStatus(format!("Unknown status '{}'", value)))
}

/// Rejects the transition unless the table allows it.
pub fn ensure_order_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Cannot transition order from '{}' to '{}'",
            from, to
        )))
    }
}

pub fn ensure_purchase_order_transition(
    from: PurchaseOrderStatus,
    to: PurchaseOrderStatus,
) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Cannot transition purchase order from '{}' to '{}'",
            from, to
        )))
    }
}

pub fn ensure_invoice_transition(
    from: InvoiceStatus,
    to: InvoiceStatus,
) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Cannot transition invoice from '{}' to '{}'",
            from, to
        )))
    }
}

pub fn ensure_payment_transition(
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Cannot transition payment from '{}' to '{}'",
            from, to
        )))
    }
}

pub fn ensure_delivery_note_transition(
    from: DeliveryNoteStatus,
    to: DeliveryNoteStatus,
) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Cannot transition delivery note from '{}' to '{}'",
            from, to
        )))
    }
}

/// Stored status an invoice falls back to when a cleared payment bounces
/// after the invoice had reached PAID. Not a table transition; it undoes
/// the settlement that produced PAID.
pub fn reverted_settlement_status(has_delivered_note: bool) -> InvoiceStatus {
    if has_delivered_note {
        InvoiceStatus::Delivered
    } else {
        InvoiceStatus::Sent
    }
}

/// Read-time effective status: an unpaid SENT/DELIVERED invoice past its
/// due date reads as OVERDUE. The stored status is never modified.
pub fn effective_invoice_status(
    stored: InvoiceStatus,
    remaining_amount: Decimal,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> InvoiceStatus {
    match stored {
        InvoiceStatus::Sent | InvoiceStatus::Delivered
            if remaining_amount > Decimal::ZERO && due_date < now =>
        {
            InvoiceStatus::Overdue
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(OrderStatus::New, OrderStatus::PendingConfirmation, true)]
    #[case(OrderStatus::New, OrderStatus::Processing, true)]
    #[case(OrderStatus::PendingConfirmation, OrderStatus::Processing, true)]
    #[case(OrderStatus::Processing, OrderStatus::Completed, true)]
    #[case(OrderStatus::New, OrderStatus::Cancelled, true)]
    #[case(OrderStatus::Processing, OrderStatus::Cancelled, true)]
    #[case(OrderStatus::Completed, OrderStatus::Cancelled, false)]
    #[case(OrderStatus::Cancelled, OrderStatus::Processing, false)]
    #[case(OrderStatus::New, OrderStatus::Completed, false)]
    fn order_transition_table(
        #[case] from: OrderStatus,
        #[case] to: OrderStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed, "{} -> {}", from, to);
    }

    #[rstest]
    #[case(PurchaseOrderStatus::Pending, PurchaseOrderStatus::Processing, true)]
    #[case(
        PurchaseOrderStatus::Processing,
        PurchaseOrderStatus::ReadyForDelivery,
        true
    )]
    #[case(
        PurchaseOrderStatus::ReadyForDelivery,
        PurchaseOrderStatus::Completed,
        true
    )]
    #[case(PurchaseOrderStatus::Pending, PurchaseOrderStatus::Cancelled, true)]
    #[case(PurchaseOrderStatus::Pending, PurchaseOrderStatus::Completed, false)]
    #[case(PurchaseOrderStatus::Completed, PurchaseOrderStatus::Cancelled, false)]
    #[case(PurchaseOrderStatus::Cancelled, PurchaseOrderStatus::Processing, false)]
    fn purchase_order_transition_table(
        #[case] from: PurchaseOrderStatus,
        #[case] to: PurchaseOrderStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed, "{} -> {}", from, to);
    }

    #[rstest]
    #[case(InvoiceStatus::Draft, InvoiceStatus::Sent, true)]
    #[case(InvoiceStatus::Sent, InvoiceStatus::Delivered, true)]
    #[case(InvoiceStatus::Sent, InvoiceStatus::Paid, true)]
    #[case(InvoiceStatus::Delivered, InvoiceStatus::Paid, true)]
    #[case(InvoiceStatus::Paid, InvoiceStatus::Completed, true)]
    #[case(InvoiceStatus::Draft, InvoiceStatus::Cancelled, true)]
    #[case(InvoiceStatus::Delivered, InvoiceStatus::Returned, true)]
    #[case(InvoiceStatus::Draft, InvoiceStatus::Paid, false)]
    #[case(InvoiceStatus::Completed, InvoiceStatus::Returned, false)]
    #[case(InvoiceStatus::Cancelled, InvoiceStatus::Sent, false)]
    #[case(InvoiceStatus::Sent, InvoiceStatus::Overdue, false)]
    fn invoice_transition_table(
        #[case] from: InvoiceStatus,
        #[case] to: InvoiceStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed, "{} -> {}", from, to);
    }

    #[rstest]
    #[case(PaymentStatus::Pending, PaymentStatus::Cleared, true)]
    #[case(PaymentStatus::Pending, PaymentStatus::Rejected, true)]
    #[case(PaymentStatus::Cleared, PaymentStatus::Rejected, true)]
    #[case(PaymentStatus::Rejected, PaymentStatus::Cleared, false)]
    #[case(PaymentStatus::Cleared, PaymentStatus::Pending, false)]
    fn payment_transition_table(
        #[case] from: PaymentStatus,
        #[case] to: PaymentStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed, "{} -> {}", from, to);
    }

    #[rstest]
    #[case(DeliveryNoteStatus::Pending, DeliveryNoteStatus::Delivered, true)]
    #[case(DeliveryNoteStatus::Pending, DeliveryNoteStatus::Cancelled, true)]
    #[case(DeliveryNoteStatus::Delivered, DeliveryNoteStatus::Cancelled, false)]
    #[case(DeliveryNoteStatus::Cancelled, DeliveryNoteStatus::Delivered, false)]
    fn delivery_note_transition_table(
        #[case] from: DeliveryNoteStatus,
        #[case] to: DeliveryNoteStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed, "{} -> {}", from, to);
    }

    #[test]
    fn statuses_round_trip_through_strings() {
        assert_eq!(OrderStatus::PendingConfirmation.to_string(), "PENDING_CONFIRMATION");
        assert_eq!(
            parse_status::<OrderStatus>("PENDING_CONFIRMATION").unwrap(),
            OrderStatus::PendingConfirmation
        );
        assert_eq!(
            PurchaseOrderStatus::ReadyForDelivery.to_string(),
            "READY_FOR_DELIVERY"
        );
        assert_eq!(
            parse_status::<PurchaseOrderStatus>("READY_FOR_DELIVERY").unwrap(),
            PurchaseOrderStatus::ReadyForDelivery
        );
        assert_eq!(InvoiceType::Product.to_string(), "PRODUCT");
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        let err = parse_status::<InvoiceStatus>("SHIPPED").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStatus(_)));
    }

    #[test]
    fn ensure_transition_names_both_states() {
        let err = ensure_invoice_transition(InvoiceStatus::Draft, InvoiceStatus::Paid).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("DRAFT"), "{}", message);
        assert!(message.contains("PAID"), "{}", message);
    }

    #[test]
    fn payment_status_follows_paid_amount() {
        let total = dec!(1_000_000);
        assert_eq!(
            InvoicePaymentStatus::from_amounts(Decimal::ZERO, total),
            InvoicePaymentStatus::Unpaid
        );
        assert_eq!(
            InvoicePaymentStatus::from_amounts(dec!(500_000), total),
            InvoicePaymentStatus::Unpaid
        );
        assert_eq!(
            InvoicePaymentStatus::from_amounts(total, total),
            InvoicePaymentStatus::Paid
        );
        assert_eq!(
            InvoicePaymentStatus::from_amounts(dec!(1_200_000), total),
            InvoicePaymentStatus::Overpaid
        );
    }

    #[test]
    fn overdue_is_computed_for_unpaid_past_due_invoices() {
        let now = Utc::now();
        let past = now - Duration::days(3);
        let future = now + Duration::days(3);

        assert_eq!(
            effective_invoice_status(InvoiceStatus::Sent, dec!(100_000), past, now),
            InvoiceStatus::Overdue
        );
        assert_eq!(
            effective_invoice_status(InvoiceStatus::Delivered, dec!(100_000), past, now),
            InvoiceStatus::Overdue
        );
        // Not yet due
        assert_eq!(
            effective_invoice_status(InvoiceStatus::Sent, dec!(100_000), future, now),
            InvoiceStatus::Sent
        );
        // Fully paid invoices never read as overdue
        assert_eq!(
            effective_invoice_status(InvoiceStatus::Paid, Decimal::ZERO, past, now),
            InvoiceStatus::Paid
        );
        assert_eq!(
            effective_invoice_status(InvoiceStatus::Sent, Decimal::ZERO, past, now),
            InvoiceStatus::Sent
        );
    }
}
