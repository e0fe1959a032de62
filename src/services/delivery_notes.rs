use crate::{
    db::DbPool,
    entities::delivery_note::{
        self, ActiveModel as DeliveryNoteActiveModel, Entity as DeliveryNoteEntity,
        Model as DeliveryNoteModel,
    },
    entities::invoice::{ActiveModel as InvoiceActiveModel, Entity as InvoiceEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::{
        ensure_delivery_note_transition, ensure_invoice_transition, parse_status,
        DeliveryNoteStatus, InvoiceStatus, InvoiceType,
    },
    services::numbering::{document_number, DELIVERY_NOTE_PREFIX},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateDeliveryNoteRequest {
    pub invoice_id: Uuid,
    #[validate(length(min = 1, max = 120, message = "Driver name is required"))]
    pub driver_name: String,
    #[validate(length(min = 1, max = 20, message = "Vehicle number is required"))]
    pub vehicle_number: String,
    pub delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct MarkDeliveredRequest {
    #[validate(length(min = 1, max = 120, message = "Recipient name cannot be empty"))]
    pub recipient_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryNoteResponse {
    pub id: Uuid,
    pub delivery_number: String,
    pub invoice_id: Uuid,
    pub driver_name: String,
    pub vehicle_number: String,
    pub delivery_date: DateTime<Utc>,
    pub recipient_name: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeliveryNoteListResponse {
    pub delivery_notes: Vec<DeliveryNoteResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct DeliveryNoteService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl DeliveryNoteService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Issues the surat jalan for a SENT PRODUCT invoice flagged
    /// `use_delivery_note`. An invoice gets one delivery note, ever: a
    /// cancelled note does not free the slot.
    #[instrument(skip(self, request), fields(invoice_id = %request.invoice_id))]
    pub async fn create_delivery_note(
        &self,
        request: CreateDeliveryNoteRequest,
    ) -> Result<DeliveryNoteResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let note_id = Uuid::new_v4();
        let now = Utc::now();
        let delivery_date = request.delivery_date.unwrap_or(now);

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let invoice = InvoiceEntity::find_by_id(request.invoice_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let invoice_type: InvoiceType = parse_status(&invoice.invoice_type)?;
        if invoice_type != InvoiceType::Product {
            return Err(ServiceError::InvalidOperation(
                "Delivery notes exist only for PRODUCT invoices".to_string(),
            ));
        }
        if !invoice.use_delivery_note {
            return Err(ServiceError::InvalidOperation(
                "This invoice was issued without a delivery note".to_string(),
            ));
        }

        let invoice_status: InvoiceStatus = parse_status(&invoice.status)?;
        if invoice_status != InvoiceStatus::Sent {
            return Err(ServiceError::InvalidOperation(format!(
                "Delivery note requires a SENT invoice, this one is {}",
                invoice_status
            )));
        }

        let existing = DeliveryNoteEntity::find()
            .filter(delivery_note::Column::InvoiceId.eq(request.invoice_id))
            .count(&txn)
            .await
            .map_err(ServiceError::from_db)?;
        if existing > 0 {
            return Err(ServiceError::Conflict(
                "A delivery note already exists for this invoice".to_string(),
            ));
        }

        let active = DeliveryNoteActiveModel {
            id: Set(note_id),
            delivery_number: Set(document_number(DELIVERY_NOTE_PREFIX, delivery_date)),
            invoice_id: Set(request.invoice_id),
            driver_name: Set(request.driver_name.trim().to_string()),
            vehicle_number: Set(request.vehicle_number.trim().to_uppercase()),
            delivery_date: Set(delivery_date),
            recipient_name: Set(None),
            status: Set(DeliveryNoteStatus::Pending.to_string()),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = active.insert(&txn).await.map_err(|e| {
            error!(error = %e, invoice_id = %request.invoice_id, "Failed to create delivery note");
            ServiceError::from_db_on(e, "invoice")
        })?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(delivery_note_id = %note_id, invoice_id = %request.invoice_id, "Delivery note created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::DeliveryNoteCreated(note_id)).await {
                warn!(error = %e, delivery_note_id = %note_id, "Failed to send delivery note created event");
            }
        }

        Ok(model_to_response(model))
    }

    #[instrument(skip(self), fields(delivery_note_id = %note_id))]
    pub async fn get_delivery_note(
        &self,
        note_id: Uuid,
    ) -> Result<DeliveryNoteResponse, ServiceError> {
        let db = &*self.db_pool;

        let note = DeliveryNoteEntity::find_by_id(note_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Delivery note not found".to_string()))?;

        Ok(model_to_response(note))
    }

    /// Fetches the raw model for document rendering.
    pub async fn get_delivery_note_model(
        &self,
        note_id: Uuid,
    ) -> Result<DeliveryNoteModel, ServiceError> {
        let db = &*self.db_pool;

        DeliveryNoteEntity::find_by_id(note_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Delivery note not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_delivery_notes(
        &self,
        page: u64,
        per_page: u64,
        status: Option<String>,
        invoice_id: Option<Uuid>,
    ) -> Result<DeliveryNoteListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query =
            DeliveryNoteEntity::find().order_by_desc(delivery_note::Column::DeliveryDate);
        if let Some(status) = status.as_deref().filter(|s| !s.is_empty()) {
            let status: DeliveryNoteStatus = parse_status(status)?;
            query = query.filter(delivery_note::Column::Status.eq(status.to_string()));
        }
        if let Some(invoice_id) = invoice_id {
            query = query.filter(delivery_note::Column::InvoiceId.eq(invoice_id));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let delivery_notes = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(DeliveryNoteListResponse {
            delivery_notes: delivery_notes.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Marks the delivery done and moves a SENT invoice to DELIVERED in
    /// the same transaction. An invoice already PAID keeps its status.
    #[instrument(skip(self, request), fields(delivery_note_id = %note_id))]
    pub async fn mark_delivered(
        &self,
        note_id: Uuid,
        request: MarkDeliveredRequest,
    ) -> Result<DeliveryNoteResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let note = DeliveryNoteEntity::find_by_id(note_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Delivery note not found".to_string()))?;

        let from: DeliveryNoteStatus = parse_status(&note.status)?;
        ensure_delivery_note_transition(from, DeliveryNoteStatus::Delivered)?;

        let invoice_id = note.invoice_id;
        let mut active: DeliveryNoteActiveModel = note.into();
        active.status = Set(DeliveryNoteStatus::Delivered.to_string());
        if let Some(recipient) = request.recipient_name {
            active.recipient_name = Set(Some(recipient.trim().to_string()));
        }
        active.updated_at = Set(Some(now));

        let updated = active.update(&txn).await.map_err(ServiceError::from_db)?;

        let invoice = InvoiceEntity::find_by_id(invoice_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let invoice_status: InvoiceStatus = parse_status(&invoice.status)?;
        if invoice_status == InvoiceStatus::Sent {
            ensure_invoice_transition(invoice_status, InvoiceStatus::Delivered)?;
            let mut invoice_active: InvoiceActiveModel = invoice.into();
            invoice_active.status = Set(InvoiceStatus::Delivered.to_string());
            invoice_active.updated_at = Set(Some(now));
            invoice_active
                .update(&txn)
                .await
                .map_err(ServiceError::from_db)?;
        }

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(delivery_note_id = %note_id, invoice_id = %invoice_id, "Delivery note delivered");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::DeliveryNoteDelivered(note_id))
                .await
            {
                warn!(error = %e, delivery_note_id = %note_id, "Failed to send delivery note delivered event");
            }
        }

        Ok(model_to_response(updated))
    }

    #[instrument(skip(self), fields(delivery_note_id = %note_id))]
    pub async fn cancel_delivery_note(
        &self,
        note_id: Uuid,
    ) -> Result<DeliveryNoteResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let note = DeliveryNoteEntity::find_by_id(note_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Delivery note not found".to_string()))?;

        let from: DeliveryNoteStatus = parse_status(&note.status)?;
        ensure_delivery_note_transition(from, DeliveryNoteStatus::Cancelled)?;

        let mut active: DeliveryNoteActiveModel = note.into();
        active.status = Set(DeliveryNoteStatus::Cancelled.to_string());
        active.updated_at = Set(Some(now));

        let updated = active.update(db).await.map_err(ServiceError::from_db)?;

        info!(delivery_note_id = %note_id, "Delivery note cancelled");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::DeliveryNoteCancelled(note_id))
                .await
            {
                warn!(error = %e, delivery_note_id = %note_id, "Failed to send delivery note cancelled event");
            }
        }

        Ok(model_to_response(updated))
    }
}

fn model_to_response(model: DeliveryNoteModel) -> DeliveryNoteResponse {
    DeliveryNoteResponse {
        id: model.id,
        delivery_number: model.delivery_number,
        invoice_id: model.invoice_id,
        driver_name: model.driver_name,
        vehicle_number: model.vehicle_number,
        delivery_date: model.delivery_date,
        recipient_name: model.recipient_name,
        status: model.status,
        notes: model.notes,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_driver_and_vehicle() {
        let request = CreateDeliveryNoteRequest {
            invoice_id: Uuid::new_v4(),
            driver_name: "".to_string(),
            vehicle_number: "B 9981 KYK".to_string(),
            delivery_date: None,
            notes: None,
        };
        assert!(request.validate().is_err());

        let request = CreateDeliveryNoteRequest {
            invoice_id: Uuid::new_v4(),
            driver_name: "Pak Joko".to_string(),
            vehicle_number: "".to_string(),
            delivery_date: None,
            notes: None,
        };
        assert!(request.validate().is_err());
    }
}
