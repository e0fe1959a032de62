use crate::{
    db::DbPool,
    entities::invoice::{ActiveModel as InvoiceActiveModel, Entity as InvoiceEntity},
    entities::swap::{
        self, ActiveModel as SwapActiveModel, Entity as SwapEntity, Model as SwapModel,
    },
    entities::swap_item::{
        self, ActiveModel as SwapItemActiveModel, Entity as SwapItemEntity,
        Model as SwapItemModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::{ensure_invoice_transition, parse_status, InvoiceStatus},
    services::numbering::{document_number, SWAP_PREFIX},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct SwapItemInput {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Item description is required"))]
    pub description: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSwapRequest {
    pub invoice_id: Uuid,
    /// Value of the goods taken back from the customer.
    pub original_value: Decimal,
    pub swap_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "A swap needs at least one replacement item"))]
    pub items: Vec<SwapItemInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SwapItemResponse {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SwapResponse {
    pub id: Uuid,
    pub swap_number: String,
    pub invoice_id: Uuid,
    pub swap_date: DateTime<Utc>,
    pub original_value: Decimal,
    pub replacement_value: Decimal,
    pub value_difference: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Loaded on the detail endpoint; empty in list responses.
    pub items: Vec<SwapItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SwapListResponse {
    pub swaps: Vec<SwapResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct SwapService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl SwapService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a tukar guling against an invoice and moves the invoice to
    /// RETURNED in the same transaction.
    #[instrument(skip(self, request), fields(invoice_id = %request.invoice_id))]
    pub async fn create_swap(&self, request: CreateSwapRequest) -> Result<SwapResponse, ServiceError> {
        request.validate()?;
        if request.original_value < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Original value cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let swap_id = Uuid::new_v4();
        let now = Utc::now();
        let swap_date = request.swap_date.unwrap_or(now);

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let invoice = InvoiceEntity::find_by_id(request.invoice_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;

        let invoice_status: InvoiceStatus = parse_status(&invoice.status)?;
        ensure_invoice_transition(invoice_status, InvoiceStatus::Returned)?;

        let mut replacement_value = Decimal::ZERO;
        let mut item_rows = Vec::with_capacity(request.items.len());
        for item in &request.items {
            item.validate()?;
            if item.unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Unit price for '{}' cannot be negative",
                    item.description
                )));
            }
            let amount = item.unit_price * Decimal::from(item.quantity);
            replacement_value += amount;
            item_rows.push(SwapItemActiveModel {
                id: Set(Uuid::new_v4()),
                swap_id: Set(swap_id),
                product_id: Set(item.product_id),
                description: Set(item.description.trim().to_string()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                amount: Set(amount),
                created_at: Set(now),
            });
        }

        let active = SwapActiveModel {
            id: Set(swap_id),
            swap_number: Set(document_number(SWAP_PREFIX, swap_date)),
            invoice_id: Set(request.invoice_id),
            swap_date: Set(swap_date),
            original_value: Set(request.original_value),
            replacement_value: Set(replacement_value),
            value_difference: Set(replacement_value - request.original_value),
            notes: Set(request.notes),
            created_at: Set(now),
        };

        let model = active.insert(&txn).await.map_err(|e| {
            error!(error = %e, invoice_id = %request.invoice_id, "Failed to create swap");
            ServiceError::from_db_on(e, "invoice")
        })?;

        for row in item_rows {
            row.insert(&txn).await.map_err(ServiceError::from_db)?;
        }

        let mut invoice_active: InvoiceActiveModel = invoice.into();
        invoice_active.status = Set(InvoiceStatus::Returned.to_string());
        invoice_active.updated_at = Set(Some(now));
        invoice_active
            .update(&txn)
            .await
            .map_err(ServiceError::from_db)?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(swap_id = %swap_id, invoice_id = %request.invoice_id, "Swap recorded, invoice returned");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::SwapRecorded {
                    swap_id,
                    invoice_id: request.invoice_id,
                })
                .await
            {
                warn!(error = %e, swap_id = %swap_id, "Failed to send swap recorded event");
            }
        }

        self.load_response(db, model).await
    }

    #[instrument(skip(self), fields(swap_id = %swap_id))]
    pub async fn get_swap(&self, swap_id: Uuid) -> Result<SwapResponse, ServiceError> {
        let db = &*self.db_pool;

        let swap = SwapEntity::find_by_id(swap_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Swap not found".to_string()))?;

        self.load_response(db, swap).await
    }

    #[instrument(skip(self))]
    pub async fn list_swaps(
        &self,
        page: u64,
        per_page: u64,
        invoice_id: Option<Uuid>,
    ) -> Result<SwapListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = SwapEntity::find().order_by_desc(swap::Column::SwapDate);
        if let Some(invoice_id) = invoice_id {
            query = query.filter(swap::Column::InvoiceId.eq(invoice_id));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let swaps = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(SwapListResponse {
            swaps: swaps
                .into_iter()
                .map(|model| model_to_response(model, Vec::new()))
                .collect(),
            total,
            page,
            per_page,
        })
    }

    async fn load_response<C: ConnectionTrait>(
        &self,
        db: &C,
        model: SwapModel,
    ) -> Result<SwapResponse, ServiceError> {
        let items = SwapItemEntity::find()
            .filter(swap_item::Column::SwapId.eq(model.id))
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;
        Ok(model_to_response(model, items))
    }
}

fn model_to_response(model: SwapModel, items: Vec<SwapItemModel>) -> SwapResponse {
    SwapResponse {
        id: model.id,
        swap_number: model.swap_number,
        invoice_id: model.invoice_id,
        swap_date: model.swap_date,
        original_value: model.original_value,
        replacement_value: model.replacement_value,
        value_difference: model.value_difference,
        notes: model.notes,
        created_at: model.created_at,
        items: items
            .into_iter()
            .map(|item| SwapItemResponse {
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
    use rust_decimal_macros::dec;

    #[test]
    fn swap_requires_at_least_one_item() {
        let request = CreateSwapRequest {
            invoice_id: Uuid::new_v4(),
            original_value: dec!(100_000),
            swap_date: None,
            notes: None,
            items: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn item_input_rejects_zero_quantity() {
        let item = SwapItemInput {
            product_id: None,
            description: "Beras premium 5kg".to_string(),
            quantity: 0,
            unit_price: dec!(75_000),
        };
        assert!(item.validate().is_err());
    }
}
