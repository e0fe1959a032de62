//! Receivables aging.
//!
//! Pure derived reporting: unpaid invoices are classified into aging
//! buckets by comparing `due_date` with the current date on every query.
//! Nothing here writes to the database.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::customer,
    entities::invoice::{self, Entity as InvoiceEntity},
    errors::ServiceError,
    services::lifecycle::InvoiceStatus,
};

/// Aging buckets by days past due.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
pub enum AgingBucket {
    #[strum(serialize = "CURRENT")]
    #[serde(rename = "CURRENT")]
    Current,
    #[strum(serialize = "OVERDUE_1_30")]
    #[serde(rename = "OVERDUE_1_30")]
    Overdue1To30,
    #[strum(serialize = "OVERDUE_31_60")]
    #[serde(rename = "OVERDUE_31_60")]
    Overdue31To60,
    #[strum(serialize = "OVERDUE_60_PLUS")]
    #[serde(rename = "OVERDUE_60_PLUS")]
    Overdue60Plus,
}

/// Bucket boundaries: day 30 is still OVERDUE_1_30, day 31 starts
/// OVERDUE_31_60.
pub fn classify_days_overdue(days_overdue: i64) -> AgingBucket {
    match days_overdue {
        d if d <= 0 => AgingBucket::Current,
        1..=30 => AgingBucket::Overdue1To30,
        31..=60 => AgingBucket::Overdue31To60,
        _ => AgingBucket::Overdue60Plus,
    }
}

/// Whole days between the due date and `as_of`, by calendar date.
pub fn days_overdue(due_date: DateTime<Utc>, as_of: DateTime<Utc>) -> i64 {
    (as_of.date_naive() - due_date.date_naive()).num_days()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgingInvoice {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub days_overdue: i64,
    pub bucket: AgingBucket,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerReceivables {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub total_outstanding: Decimal,
    pub invoices: Vec<AgingInvoice>,
}

/// Per-bucket outstanding totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AgingSummary {
    pub current: Decimal,
    pub overdue_1_30: Decimal,
    pub overdue_31_60: Decimal,
    pub overdue_60_plus: Decimal,
    pub total_outstanding: Decimal,
}

impl AgingSummary {
    fn add(&mut self, bucket: AgingBucket, amount: Decimal) {
        match bucket {
            AgingBucket::Current => self.current += amount,
            AgingBucket::Overdue1To30 => self.overdue_1_30 += amount,
            AgingBucket::Overdue31To60 => self.overdue_31_60 += amount,
            AgingBucket::Overdue60Plus => self.overdue_60_plus += amount,
        }
        self.total_outstanding += amount;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgingReport {
    pub as_of: DateTime<Utc>,
    pub summary: AgingSummary,
    pub customers: Vec<CustomerReceivables>,
}

#[derive(Clone)]
pub struct ReceivablesService {
    db_pool: Arc<DbPool>,
}

impl ReceivablesService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Full aging report: per-bucket totals plus per-invoice rows grouped
    /// by customer, customers ordered by outstanding amount descending.
    #[instrument(skip(self))]
    pub async fn aging_report(&self) -> Result<AgingReport, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let rows = InvoiceEntity::find()
            .filter(
                invoice::Column::Status.is_in([
                    InvoiceStatus::Sent.to_string(),
                    InvoiceStatus::Delivered.to_string(),
                ]),
            )
            .filter(invoice::Column::RemainingAmount.gt(Decimal::ZERO))
            .order_by_asc(invoice::Column::DueDate)
            .find_also_related(customer::Entity)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load open invoices for aging report");
                ServiceError::DatabaseError(e)
            })?;

        Ok(build_report(rows, now))
    }

    /// Bucket totals only.
    #[instrument(skip(self))]
    pub async fn aging_summary(&self) -> Result<AgingSummary, ServiceError> {
        Ok(self.aging_report().await?.summary)
    }
}

/// Builds the report from already-loaded invoice/customer rows.
fn build_report(
    rows: Vec<(invoice::Model, Option<customer::Model>)>,
    as_of: DateTime<Utc>,
) -> AgingReport {
    let mut summary = AgingSummary::default();
    let mut customers: Vec<CustomerReceivables> = Vec::new();

    for (inv, cust) in rows {
        let overdue_days = days_overdue(inv.due_date, as_of);
        let bucket = classify_days_overdue(overdue_days);
        summary.add(bucket, inv.remaining_amount);

        let customer_name = cust
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Unknown customer".to_string());

        let row = AgingInvoice {
            invoice_id: inv.id,
            invoice_number: inv.invoice_number,
            customer_id: inv.customer_id,
            customer_name: customer_name.clone(),
            invoice_date: inv.invoice_date,
            due_date: inv.due_date,
            total_amount: inv.total_amount,
            paid_amount: inv.paid_amount,
            remaining_amount: inv.remaining_amount,
            days_overdue: overdue_days,
            bucket,
        };

        match customers
            .iter_mut()
            .find(|c| c.customer_id == row.customer_id)
        {
            Some(group) => {
                group.total_outstanding += row.remaining_amount;
                group.invoices.push(row);
            }
            None => customers.push(CustomerReceivables {
                customer_id: row.customer_id,
                customer_name,
                total_outstanding: row.remaining_amount,
                invoices: vec![row],
            }),
        }
    }

    customers.sort_by(|a, b| b.total_outstanding.cmp(&a.total_outstanding));

    AgingReport {
        as_of,
        summary,
        customers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(-5, AgingBucket::Current ; "not yet due")]
    #[test_case(0, AgingBucket::Current ; "due today")]
    #[test_case(1, AgingBucket::Overdue1To30 ; "one day late")]
    #[test_case(30, AgingBucket::Overdue1To30 ; "day thirty still first bucket")]
    #[test_case(31, AgingBucket::Overdue31To60 ; "day thirty one second bucket")]
    #[test_case(60, AgingBucket::Overdue31To60 ; "day sixty still second bucket")]
    #[test_case(61, AgingBucket::Overdue60Plus ; "day sixty one last bucket")]
    #[test_case(365, AgingBucket::Overdue60Plus ; "a year late")]
    fn bucket_boundaries(days: i64, expected: AgingBucket) {
        assert_eq!(classify_days_overdue(days), expected);
    }

    #[test]
    fn bucket_labels_match_report_vocabulary() {
        assert_eq!(AgingBucket::Current.to_string(), "CURRENT");
        assert_eq!(AgingBucket::Overdue1To30.to_string(), "OVERDUE_1_30");
        assert_eq!(AgingBucket::Overdue31To60.to_string(), "OVERDUE_31_60");
        assert_eq!(AgingBucket::Overdue60Plus.to_string(), "OVERDUE_60_PLUS");
    }

    fn open_invoice(
        customer_id: Uuid,
        due_in_days: i64,
        remaining: Decimal,
        as_of: DateTime<Utc>,
    ) -> invoice::Model {
        let total = remaining + dec!(500_000);
        invoice::Model {
            id: Uuid::new_v4(),
            invoice_number: format!("INV-{}", Uuid::new_v4().simple()),
            purchase_order_id: Uuid::new_v4(),
            customer_id,
            invoice_type: "PRODUCT".to_string(),
            use_delivery_note: false,
            status: "SENT".to_string(),
            payment_status: "UNPAID".to_string(),
            invoice_date: as_of - Duration::days(30),
            due_date: as_of + Duration::days(due_in_days),
            subtotal: total,
            tax_rate: dec!(0.11),
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            total_amount: total,
            paid_amount: dec!(500_000),
            remaining_amount: remaining,
            notes: None,
            created_at: as_of - Duration::days(30),
            updated_at: None,
        }
    }

    fn named_customer(id: Uuid, name: &str, as_of: DateTime<Utc>) -> customer::Model {
        customer::Model {
            id,
            name: name.to_string(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
            city: None,
            notes: None,
            created_at: as_of,
            updated_at: None,
        }
    }

    #[test]
    fn report_groups_by_customer_and_totals_buckets() {
        let as_of = Utc::now();
        let toko = Uuid::new_v4();
        let warung = Uuid::new_v4();

        let rows = vec![
            (
                open_invoice(toko, -31, dec!(1_000_000), as_of),
                Some(named_customer(toko, "Toko Sinar Jaya", as_of)),
            ),
            (
                open_invoice(toko, 10, dec!(250_000), as_of),
                Some(named_customer(toko, "Toko Sinar Jaya", as_of)),
            ),
            (
                open_invoice(warung, -70, dec!(400_000), as_of),
                Some(named_customer(warung, "Warung Berkah", as_of)),
            ),
        ];

        let report = build_report(rows, as_of);

        assert_eq!(report.summary.current, dec!(250_000));
        assert_eq!(report.summary.overdue_31_60, dec!(1_000_000));
        assert_eq!(report.summary.overdue_60_plus, dec!(400_000));
        assert_eq!(report.summary.overdue_1_30, Decimal::ZERO);
        assert_eq!(report.summary.total_outstanding, dec!(1_650_000));

        assert_eq!(report.customers.len(), 2);
        // Largest outstanding first
        assert_eq!(report.customers[0].customer_name, "Toko Sinar Jaya");
        assert_eq!(report.customers[0].total_outstanding, dec!(1_250_000));
        assert_eq!(report.customers[0].invoices.len(), 2);
        assert_eq!(report.customers[1].total_outstanding, dec!(400_000));
    }

    #[test]
    fn due_exactly_thirty_days_ago_lands_in_first_bucket() {
        let as_of = Utc::now();
        let customer_id = Uuid::new_v4();
        let rows = vec![(
            open_invoice(customer_id, -30, dec!(100_000), as_of),
            Some(named_customer(customer_id, "PT Maju", as_of)),
        )];

        let report = build_report(rows, as_of);
        assert_eq!(report.summary.overdue_1_30, dec!(100_000));
        assert_eq!(report.customers[0].invoices[0].days_overdue, 30);
        assert_eq!(
            report.customers[0].invoices[0].bucket,
            AgingBucket::Overdue1To30
        );
    }
}
