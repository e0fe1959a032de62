use crate::{
    db::DbPool,
    entities::delivery_note::{self, Entity as DeliveryNoteEntity},
    entities::invoice::{
        self, ActiveModel as InvoiceActiveModel, Entity as InvoiceEntity, Model as InvoiceModel,
    },
    entities::invoice_item::{
        self, ActiveModel as InvoiceItemActiveModel, Entity as InvoiceItemEntity,
        Model as InvoiceItemModel,
    },
    entities::order::Entity as OrderEntity,
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::purchase_order::Entity as PurchaseOrderEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::{
        effective_invoice_status, ensure_invoice_transition, parse_status, DeliveryNoteStatus,
        InvoicePaymentStatus, InvoiceStatus, InvoiceType, PurchaseOrderStatus,
    },
    services::numbering::{document_number, INVOICE_PREFIX},
    services::products::active_tax_rate,
    services::receivables::days_overdue,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct GenerateInvoiceRequest {
    /// PRODUCT or SERVICE.
    pub invoice_type: String,
    /// Only meaningful for PRODUCT invoices.
    pub use_delivery_note: Option<bool>,
    pub discount_amount: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
    pub invoice_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct InvoiceFilter {
    /// Matches the invoice number.
    pub search: Option<String>,
    pub customer_id: Option<Uuid>,
    /// Stored statuses plus the computed OVERDUE filter.
    pub status: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceItemResponse {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub purchase_order_id: Uuid,
    pub customer_id: Uuid,
    pub invoice_type: String,
    pub use_delivery_note: bool,
    /// Effective status: OVERDUE is layered over SENT/DELIVERED at read
    /// time and never stored.
    pub status: String,
    pub payment_status: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub days_overdue: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<InvoiceItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Generates the invoice for a purchase order that has left PENDING.
    /// Line items are copied from the order, the active tax is applied,
    /// and the due date follows the PO's NET terms.
    #[instrument(skip(self, request), fields(purchase_order_id = %po_id))]
    pub async fn create_for_purchase_order(
        &self,
        po_id: Uuid,
        request: GenerateInvoiceRequest,
    ) -> Result<InvoiceResponse, ServiceError> {
        request.validate()?;

        let invoice_type = InvoiceType::from_str(&request.invoice_type).map_err(|_| {
            ServiceError::ValidationError(format!(
                "Unknown invoice type '{}'; expected PRODUCT or SERVICE",
                request.invoice_type
            ))
        })?;
        let use_delivery_note = request.use_delivery_note.unwrap_or(false);
        if use_delivery_note && invoice_type != InvoiceType::Product {
            return Err(ServiceError::ValidationError(
                "Only PRODUCT invoices can use a delivery note".to_string(),
            ));
        }

        let discount = request.discount_amount.unwrap_or(Decimal::ZERO);
        let shipping = request.shipping_cost.unwrap_or(Decimal::ZERO);
        if discount < Decimal::ZERO || shipping < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Discount and shipping cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let invoice_id = Uuid::new_v4();
        let now = Utc::now();
        let invoice_date = request.invoice_date.unwrap_or(now);

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let po = PurchaseOrderEntity::find_by_id(po_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))?;

        let po_status: PurchaseOrderStatus = parse_status(&po.status)?;
        if !po_status.allows_invoicing() {
            return Err(ServiceError::InvalidOperation(format!(
                "Invoice requires a PROCESSING or READY_FOR_DELIVERY purchase order, this one is {}",
                po_status
            )));
        }

        let existing = InvoiceEntity::find()
            .filter(invoice::Column::PurchaseOrderId.eq(po_id))
            .count(&txn)
            .await
            .map_err(ServiceError::from_db)?;
        if existing > 0 {
            return Err(ServiceError::Conflict(
                "An invoice already exists for this purchase order".to_string(),
            ));
        }

        let order = OrderEntity::find_by_id(po.order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let order_items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        if order_items.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "Order has no items to invoice".to_string(),
            ));
        }

        let subtotal: Decimal = order_items.iter().map(|i| i.amount).sum();
        let tax_rate = active_tax_rate(&txn).await?;
        let tax_amount = subtotal * tax_rate;
        let total_amount = subtotal + tax_amount - discount + shipping;
        if total_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Discount exceeds the invoice total".to_string(),
            ));
        }
        let due_date = invoice_date + Duration::days(po.net_terms as i64);

        let active = InvoiceActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(document_number(INVOICE_PREFIX, invoice_date)),
            purchase_order_id: Set(po_id),
            customer_id: Set(order.customer_id),
            invoice_type: Set(invoice_type.to_string()),
            use_delivery_note: Set(use_delivery_note),
            status: Set(InvoiceStatus::Draft.to_string()),
            payment_status: Set(InvoicePaymentStatus::Unpaid.to_string()),
            invoice_date: Set(invoice_date),
            due_date: Set(due_date),
            subtotal: Set(subtotal),
            tax_rate: Set(tax_rate),
            tax_amount: Set(tax_amount),
            discount_amount: Set(discount),
            shipping_cost: Set(shipping),
            total_amount: Set(total_amount),
            paid_amount: Set(Decimal::ZERO),
            remaining_amount: Set(total_amount),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = active.insert(&txn).await.map_err(|e| {
            error!(error = %e, purchase_order_id = %po_id, "Failed to create invoice");
            ServiceError::from_db_on(e, "purchase order")
        })?;

        for item in &order_items {
            let invoice_item = InvoiceItemActiveModel {
                id: Set(Uuid::new_v4()),
                invoice_id: Set(invoice_id),
                product_id: Set(Some(item.product_id)),
                description: Set(item.description.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                amount: Set(item.amount),
                created_at: Set(now),
            };
            invoice_item
                .insert(&txn)
                .await
                .map_err(ServiceError::from_db)?;
        }

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(
            invoice_id = %invoice_id,
            purchase_order_id = %po_id,
            total = %total_amount,
            "Invoice created"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::InvoiceCreated(invoice_id)).await {
                warn!(error = %e, invoice_id = %invoice_id, "Failed to send invoice created event");
            }
        }

        self.load_response(model).await
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<InvoiceResponse, ServiceError> {
        let db = &*self.db_pool;

        let invoice = InvoiceEntity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        self.load_response(invoice).await
    }

    /// Fetches the raw model for document rendering.
    pub async fn get_invoice_model(
        &self,
        invoice_id: Uuid,
    ) -> Result<(InvoiceModel, Vec<InvoiceItemModel>), ServiceError> {
        let db = &*self.db_pool;

        let invoice = InvoiceEntity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let items = InvoiceItemEntity::find()
            .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        Ok((invoice, items))
    }

    /// Searches invoices by number, customer, status and date range. The
    /// OVERDUE status filter matches the read-time classification, not a
    /// stored value.
    #[instrument(skip(self))]
    pub async fn search_invoices(
        &self,
        page: u64,
        per_page: u64,
        filter: InvoiceFilter,
    ) -> Result<InvoiceListResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let mut query = InvoiceEntity::find().order_by_desc(invoice::Column::InvoiceDate);

        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(invoice::Column::InvoiceNumber.contains(term.trim()));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(invoice::Column::CustomerId.eq(customer_id));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(invoice::Column::InvoiceDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(invoice::Column::InvoiceDate.lte(to));
        }
        if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
            let status: InvoiceStatus = parse_status(status)?;
            if status == InvoiceStatus::Overdue {
                query = query.filter(
                    Condition::all()
                        .add(
                            invoice::Column::Status.is_in([
                                InvoiceStatus::Sent.to_string(),
                                InvoiceStatus::Delivered.to_string(),
                            ]),
                        )
                        .add(invoice::Column::RemainingAmount.gt(Decimal::ZERO))
                        .add(invoice::Column::DueDate.lt(now)),
                );
            } else {
                query = query.filter(invoice::Column::Status.eq(status.to_string()));
                if status == InvoiceStatus::Sent || status == InvoiceStatus::Delivered {
                    // Exclude rows that would read as OVERDUE
                    query = query.filter(
                        Condition::any()
                            .add(invoice::Column::DueDate.gte(now))
                            .add(invoice::Column::RemainingAmount.lte(Decimal::ZERO)),
                    );
                }
            }
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let invoices = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(InvoiceListResponse {
            invoices: invoices
                .into_iter()
                .map(|inv| model_to_response(inv, Vec::new(), now))
                .collect(),
            total,
            page,
            per_page,
        })
    }

    /// DRAFT → SENT: the invoice goes out to the customer.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn send_invoice(&self, invoice_id: Uuid) -> Result<InvoiceResponse, ServiceError> {
        self.transition(invoice_id, InvoiceStatus::Sent).await
    }

    /// PAID → COMPLETED: archives a fully settled invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn complete_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<InvoiceResponse, ServiceError> {
        self.transition(invoice_id, InvoiceStatus::Completed).await
    }

    /// Cancels the invoice. Refused while money or a live delivery note
    /// hangs off it.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn cancel_invoice(&self, invoice_id: Uuid) -> Result<InvoiceResponse, ServiceError> {
        let db = &*self.db_pool;

        let invoice = InvoiceEntity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        if invoice.paid_amount > Decimal::ZERO {
            return Err(ServiceError::InvalidOperation(
                "Reject the cleared payments on this invoice before cancelling it".to_string(),
            ));
        }

        let live_notes = DeliveryNoteEntity::find()
            .filter(delivery_note::Column::InvoiceId.eq(invoice_id))
            .filter(
                delivery_note::Column::Status.ne(DeliveryNoteStatus::Cancelled.to_string()),
            )
            .count(db)
            .await
            .map_err(ServiceError::from_db)?;
        if live_notes > 0 {
            return Err(ServiceError::InvalidOperation(
                "Cancel the delivery note for this invoice first".to_string(),
            ));
        }

        self.transition(invoice_id, InvoiceStatus::Cancelled).await
    }

    async fn transition(
        &self,
        invoice_id: Uuid,
        to: InvoiceStatus,
    ) -> Result<InvoiceResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let invoice = InvoiceEntity::find_by_id(invoice_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let from: InvoiceStatus = parse_status(&invoice.status)?;
        ensure_invoice_transition(from, to)?;

        let mut active: InvoiceActiveModel = invoice.into();
        active.status = Set(to.to_string());
        active.updated_at = Set(Some(now));

        let updated = active.update(&txn).await.map_err(ServiceError::from_db)?;
        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(invoice_id = %invoice_id, from = %from, to = %to, "Invoice transitioned");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::InvoiceStatusChanged {
                    invoice_id,
                    old_status: from.to_string(),
                    new_status: to.to_string(),
                })
                .await
            {
                warn!(error = %e, invoice_id = %invoice_id, "Failed to send invoice status event");
            }
        }

        self.load_response(updated).await
    }

    async fn load_response(&self, invoice: InvoiceModel) -> Result<InvoiceResponse, ServiceError> {
        let db = &*self.db_pool;

        let items = InvoiceItemEntity::find()
            .filter(invoice_item::Column::InvoiceId.eq(invoice.id))
            .order_by_asc(invoice_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(model_to_response(invoice, items, Utc::now()))
    }
}

fn model_to_response(
    invoice: InvoiceModel,
    items: Vec<InvoiceItemModel>,
    now: DateTime<Utc>,
) -> InvoiceResponse {
    let stored = InvoiceStatus::from_str(&invoice.status).unwrap_or(InvoiceStatus::Draft);
    let effective = effective_invoice_status(stored, invoice.remaining_amount, invoice.due_date, now);
    let overdue_days = match effective {
        InvoiceStatus::Overdue => Some(days_overdue(invoice.due_date, now)),
        _ => None,
    };

    InvoiceResponse {
        id: invoice.id,
        invoice_number: invoice.invoice_number,
        purchase_order_id: invoice.purchase_order_id,
        customer_id: invoice.customer_id,
        invoice_type: invoice.invoice_type,
        use_delivery_note: invoice.use_delivery_note,
        status: effective.to_string(),
        payment_status: invoice.payment_status,
        invoice_date: invoice.invoice_date,
        due_date: invoice.due_date,
        subtotal: invoice.subtotal,
        tax_rate: invoice.tax_rate,
        tax_amount: invoice.tax_amount,
        discount_amount: invoice.discount_amount,
        shipping_cost: invoice.shipping_cost,
        total_amount: invoice.total_amount,
        paid_amount: invoice.paid_amount,
        remaining_amount: invoice.remaining_amount,
        days_overdue: overdue_days,
        notes: invoice.notes,
        created_at: invoice.created_at,
        updated_at: invoice.updated_at,
        items: items
            .into_iter()
            .map(|item| InvoiceItemResponse {
                id: item.id,
                product_id: item.product_id,
                description: item.description,
                quantity: item.quantity,
                unit_price: item.unit_price,
                amount: item.amount,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn base_invoice(now: DateTime<Utc>) -> InvoiceModel {
        InvoiceModel {
            id: Uuid::new_v4(),
            invoice_number: "INV-20240615-A1B2C3".to_string(),
            purchase_order_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            invoice_type: "PRODUCT".to_string(),
            use_delivery_note: true,
            status: "SENT".to_string(),
            payment_status: "UNPAID".to_string(),
            invoice_date: now - Duration::days(40),
            due_date: now - Duration::days(10),
            subtotal: dec!(1_000_000),
            tax_rate: dec!(0.11),
            tax_amount: dec!(110_000),
            discount_amount: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            total_amount: dec!(1_110_000),
            paid_amount: Decimal::ZERO,
            remaining_amount: dec!(1_110_000),
            notes: None,
            created_at: now - Duration::days(40),
            updated_at: None,
        }
    }

    #[test]
    fn response_status_reads_overdue_without_touching_storage() {
        let now = Utc::now();
        let invoice = base_invoice(now);

        let response = model_to_response(invoice, Vec::new(), now);
        assert_eq!(response.status, "OVERDUE");
        assert_eq!(response.days_overdue, Some(10));
    }

    #[test]
    fn paid_invoice_never_reads_overdue() {
        let now = Utc::now();
        let mut invoice = base_invoice(now);
        invoice.status = "PAID".to_string();
        invoice.payment_status = "PAID".to_string();
        invoice.paid_amount = invoice.total_amount;
        invoice.remaining_amount = Decimal::ZERO;

        let response = model_to_response(invoice, Vec::new(), now);
        assert_eq!(response.status, "PAID");
        assert_eq!(response.days_overdue, None);
    }
}
