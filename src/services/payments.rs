use crate::{
    db::DbPool,
    entities::delivery_note::{self, Entity as DeliveryNoteEntity},
    entities::invoice::{ActiveModel as InvoiceActiveModel, Entity as InvoiceEntity},
    entities::payment::{
        self, ActiveModel as PaymentActiveModel, Entity as PaymentEntity, Model as PaymentModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::{
        ensure_invoice_transition, ensure_payment_transition, parse_status,
        reverted_settlement_status, DeliveryNoteStatus, InvoicePaymentStatus, InvoiceStatus,
        PaymentStatus,
    },
    services::numbering::{document_number, PAYMENT_PREFIX},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    /// Free-form method, e.g. CASH, TRANSFER, GIRO.
    #[validate(length(min = 1, max = 40, message = "Payment method is required"))]
    pub method: String,
    /// Bank slip / giro number.
    pub reference: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub payment_number: String,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub status: String,
    pub reference: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub cleared_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a PENDING payment against an open invoice. Invoice totals
    /// are untouched until the payment clears.
    #[instrument(skip(self, request), fields(invoice_id = %request.invoice_id, amount = %request.amount))]
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentResponse, ServiceError> {
        request.validate()?;
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let payment_id = Uuid::new_v4();
        let now = Utc::now();
        let payment_date = request.payment_date.unwrap_or(now);

        let invoice = InvoiceEntity::find_by_id(request.invoice_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let invoice_status: InvoiceStatus = parse_status(&invoice.status)?;
        if !matches!(invoice_status, InvoiceStatus::Sent | InvoiceStatus::Delivered) {
            return Err(ServiceError::InvalidOperation(format!(
                "Payments can only be recorded against SENT or DELIVERED invoices, this one is {}",
                invoice_status
            )));
        }

        let active = PaymentActiveModel {
            id: Set(payment_id),
            payment_number: Set(document_number(PAYMENT_PREFIX, payment_date)),
            invoice_id: Set(request.invoice_id),
            amount: Set(request.amount),
            method: Set(request.method.trim().to_uppercase()),
            status: Set(PaymentStatus::Pending.to_string()),
            reference: Set(request.reference),
            payment_date: Set(payment_date),
            cleared_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = active.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to record payment");
            ServiceError::from_db_on(e, "payment number")
        })?;

        info!(payment_id = %payment_id, invoice_id = %request.invoice_id, "Payment recorded");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::PaymentRecorded(payment_id)).await {
                warn!(error = %e, payment_id = %payment_id, "Failed to send payment recorded event");
            }
        }

        Ok(model_to_response(model))
    }

    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn get_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let db = &*self.db_pool;

        let payment = PaymentEntity::find_by_id(payment_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

        Ok(model_to_response(payment))
    }

    #[instrument(skip(self))]
    pub async fn list_payments(
        &self,
        page: u64,
        per_page: u64,
        invoice_id: Option<Uuid>,
        status: Option<String>,
    ) -> Result<PaymentListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = PaymentEntity::find().order_by_desc(payment::Column::PaymentDate);
        if let Some(invoice_id) = invoice_id {
            query = query.filter(payment::Column::InvoiceId.eq(invoice_id));
        }
        if let Some(status) = status.as_deref().filter(|s| !s.is_empty()) {
            let status: PaymentStatus = parse_status(status)?;
            query = query.filter(payment::Column::Status.eq(status.to_string()));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let payments = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(PaymentListResponse {
            payments: payments.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Clears a pending payment and applies it to the invoice:
    /// `paid_amount += amount`, `remaining_amount = total - paid`, payment
    /// status recomputed, and the invoice moves to PAID once nothing
    /// remains. One transaction end to end.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn clear_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let payment = PaymentEntity::find_by_id(payment_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

        let from: PaymentStatus = parse_status(&payment.status)?;
        ensure_payment_transition(from, PaymentStatus::Cleared)?;

        let invoice_id = payment.invoice_id;
        let amount = payment.amount;

        let mut active: PaymentActiveModel = payment.into();
        active.status = Set(PaymentStatus::Cleared.to_string());
        active.cleared_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await.map_err(ServiceError::from_db)?;

        let settled = self
            .apply_to_invoice(&txn, invoice_id, amount, now)
            .await?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(payment_id = %payment_id, invoice_id = %invoice_id, "Payment cleared");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::PaymentCleared(payment_id)).await {
                warn!(error = %e, payment_id = %payment_id, "Failed to send payment cleared event");
            }
            if let Some(payment_status) = settled {
                if let Err(e) = event_sender
                    .send(Event::InvoiceSettled {
                        invoice_id,
                        payment_status,
                    })
                    .await
                {
                    warn!(error = %e, invoice_id = %invoice_id, "Failed to send invoice settled event");
                }
            }
        }

        Ok(model_to_response(updated))
    }

    /// Rejects a payment. Rejecting a CLEARED payment (a bounced transfer
    /// or giro) reverses its amount on the invoice and, if the invoice had
    /// reached PAID, restores the pre-settlement status.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn reject_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let payment = PaymentEntity::find_by_id(payment_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

        let from: PaymentStatus = parse_status(&payment.status)?;
        ensure_payment_transition(from, PaymentStatus::Rejected)?;

        let invoice_id = payment.invoice_id;
        let amount = payment.amount;

        let mut active: PaymentActiveModel = payment.into();
        active.status = Set(PaymentStatus::Rejected.to_string());
        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await.map_err(ServiceError::from_db)?;

        if from == PaymentStatus::Cleared {
            self.reverse_on_invoice(&txn, invoice_id, amount, now).await?;
        }

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(payment_id = %payment_id, was = %from, "Payment rejected");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::PaymentRejected(payment_id)).await {
                warn!(error = %e, payment_id = %payment_id, "Failed to send payment rejected event");
            }
        }

        Ok(model_to_response(updated))
    }

    /// Returns the new payment status string when the invoice reached
    /// PAID/OVERPAID through this application.
    async fn apply_to_invoice(
        &self,
        txn: &DatabaseTransaction,
        invoice_id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, ServiceError> {
        let invoice = InvoiceEntity::find_by_id(invoice_id)
            .one(txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let stored_status: InvoiceStatus = parse_status(&invoice.status)?;
        let total_amount = invoice.total_amount;
        let new_paid = invoice.paid_amount + amount;
        let new_remaining = total_amount - new_paid;
        let new_payment_status = InvoicePaymentStatus::from_amounts(new_paid, total_amount);

        let mut active: InvoiceActiveModel = invoice.into();
        active.paid_amount = Set(new_paid);
        active.remaining_amount = Set(new_remaining);
        active.payment_status = Set(new_payment_status.to_string());
        active.updated_at = Set(Some(now));

        let mut settled = None;
        if new_remaining <= Decimal::ZERO {
            // A later payment clearing against an already-PAID invoice
            // only shifts the amounts (towards OVERPAID).
            if stored_status != InvoiceStatus::Paid {
                ensure_invoice_transition(stored_status, InvoiceStatus::Paid)?;
                active.status = Set(InvoiceStatus::Paid.to_string());
            }
            settled = Some(new_payment_status.to_string());
        }

        active.update(txn).await.map_err(ServiceError::from_db)?;
        Ok(settled)
    }

    async fn reverse_on_invoice(
        &self,
        txn: &DatabaseTransaction,
        invoice_id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let invoice = InvoiceEntity::find_by_id(invoice_id)
            .one(txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let stored_status: InvoiceStatus = parse_status(&invoice.status)?;
        let total_amount = invoice.total_amount;
        let new_paid = invoice.paid_amount - amount;
        let new_remaining = total_amount - new_paid;
        let new_payment_status = InvoicePaymentStatus::from_amounts(new_paid, total_amount);

        let mut active: InvoiceActiveModel = invoice.into();
        active.paid_amount = Set(new_paid);
        active.remaining_amount = Set(new_remaining);
        active.payment_status = Set(new_payment_status.to_string());
        active.updated_at = Set(Some(now));

        if stored_status == InvoiceStatus::Paid && new_remaining > Decimal::ZERO {
            let delivered_notes = DeliveryNoteEntity::find()
                .filter(delivery_note::Column::InvoiceId.eq(invoice_id))
                .filter(
                    delivery_note::Column::Status.eq(DeliveryNoteStatus::Delivered.to_string()),
                )
                .count(txn)
                .await
                .map_err(ServiceError::from_db)?;

            let restored = reverted_settlement_status(delivered_notes > 0);
            active.status = Set(restored.to_string());
            info!(invoice_id = %invoice_id, restored = %restored, "Invoice settlement reversed");
        }

        active.update(txn).await.map_err(ServiceError::from_db)?;
        Ok(())
    }
}

fn model_to_response(model: PaymentModel) -> PaymentResponse {
    PaymentResponse {
        id: model.id,
        payment_number: model.payment_number,
        invoice_id: model.invoice_id,
        amount: model.amount,
        method: model.method,
        status: model.status,
        reference: model.reference,
        payment_date: model.payment_date,
        cleared_at: model.cleared_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
