use crate::{
    db::DbPool,
    entities::invoice::{self, Entity as InvoiceEntity},
    entities::order::{ActiveModel as OrderActiveModel, Entity as OrderEntity},
    entities::purchase_order::{
        self, ActiveModel as PurchaseOrderActiveModel, Entity as PurchaseOrderEntity,
        Model as PurchaseOrderModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::{
        ensure_order_transition, ensure_purchase_order_transition, parse_status, InvoiceStatus,
        OrderStatus, PurchaseOrderStatus,
    },
    services::numbering::{document_number, PURCHASE_ORDER_PREFIX},
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
pub struct CreatePurchaseOrderRequest {
    /// Days until a generated invoice falls due; defaults to 30.
    #[validate(range(min = 1, max = 365, message = "NET terms must be 1-365 days"))]
    pub net_terms: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderResponse {
    pub id: Uuid,
    pub po_number: String,
    pub order_id: Uuid,
    pub status: String,
    pub net_terms: i32,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderListResponse {
    pub purchase_orders: Vec<PurchaseOrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PurchaseOrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Generates the purchase order for a PROCESSING order. Each order
    /// carries at most one PO for its whole life.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn create_for_order(
        &self,
        order_id: Uuid,
        request: CreatePurchaseOrderRequest,
    ) -> Result<PurchaseOrderResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let po_id = Uuid::new_v4();
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let order_status: OrderStatus = parse_status(&order.status)?;
        if order_status != OrderStatus::Processing {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase order requires a PROCESSING order, this one is {}",
                order_status
            )));
        }

        let existing = PurchaseOrderEntity::find()
            .filter(purchase_order::Column::OrderId.eq(order_id))
            .count(&txn)
            .await
            .map_err(ServiceError::from_db)?;
        if existing > 0 {
            return Err(ServiceError::Conflict(
                "A purchase order already exists for this order".to_string(),
            ));
        }

        let active = PurchaseOrderActiveModel {
            id: Set(po_id),
            po_number: Set(document_number(PURCHASE_ORDER_PREFIX, now)),
            order_id: Set(order_id),
            status: Set(PurchaseOrderStatus::Pending.to_string()),
            net_terms: Set(request.net_terms.unwrap_or(30)),
            notes: Set(request.notes),
            completed_at: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = active.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create purchase order");
            ServiceError::from_db_on(e, "order")
        })?;

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(purchase_order_id = %po_id, order_id = %order_id, "Purchase order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::PurchaseOrderCreated(po_id)).await {
                warn!(error = %e, purchase_order_id = %po_id, "Failed to send PO created event");
            }
        }

        Ok(model_to_response(model))
    }

    #[instrument(skip(self), fields(purchase_order_id = %po_id))]
    pub async fn get_purchase_order(
        &self,
        po_id: Uuid,
    ) -> Result<PurchaseOrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let po = PurchaseOrderEntity::find_by_id(po_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))?;

        Ok(model_to_response(po))
    }

    #[instrument(skip(self))]
    pub async fn list_purchase_orders(
        &self,
        page: u64,
        per_page: u64,
        status: Option<String>,
        search: Option<String>,
    ) -> Result<PurchaseOrderListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = PurchaseOrderEntity::find().order_by_desc(purchase_order::Column::CreatedAt);
        if let Some(status) = status.as_deref().filter(|s| !s.is_empty()) {
            let status: PurchaseOrderStatus = parse_status(status)?;
            query = query.filter(purchase_order::Column::Status.eq(status.to_string()));
        }
        if let Some(term) = search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(purchase_order::Column::PoNumber.contains(term.trim()));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let purchase_orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(PurchaseOrderListResponse {
            purchase_orders: purchase_orders.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Moves the PO along PENDING → PROCESSING → READY_FOR_DELIVERY →
    /// COMPLETED. Completing the PO also completes its parent order.
    #[instrument(skip(self, request), fields(purchase_order_id = %po_id, new_status = %request.status))]
    pub async fn update_status(
        &self,
        po_id: Uuid,
        request: UpdatePurchaseOrderStatusRequest,
    ) -> Result<PurchaseOrderResponse, ServiceError> {
        let to: PurchaseOrderStatus = parse_status(&request.status)?;
        if to == PurchaseOrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "Use the cancel operation to cancel a purchase order".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let po = PurchaseOrderEntity::find_by_id(po_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))?;

        let from: PurchaseOrderStatus = parse_status(&po.status)?;
        ensure_purchase_order_transition(from, to)?;

        let order_id = po.order_id;
        let mut active: PurchaseOrderActiveModel = po.into();
        active.status = Set(to.to_string());
        active.updated_at = Set(Some(now));
        if to == PurchaseOrderStatus::Completed {
            active.completed_at = Set(Some(now));
        }

        let updated = active.update(&txn).await.map_err(ServiceError::from_db)?;

        // Completion ripples up: the customer order is fulfilled.
        if to == PurchaseOrderStatus::Completed {
            let order = OrderEntity::find_by_id(order_id)
                .one(&txn)
                .await
                .map_err(ServiceError::from_db)?
                .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

            let order_status: OrderStatus = parse_status(&order.status)?;
            ensure_order_transition(order_status, OrderStatus::Completed)?;

            let mut order_active: OrderActiveModel = order.into();
            order_active.status = Set(OrderStatus::Completed.to_string());
            order_active.completed_at = Set(Some(now));
            order_active.updated_at = Set(Some(now));
            order_active
                .update(&txn)
                .await
                .map_err(ServiceError::from_db)?;
        }

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(purchase_order_id = %po_id, from = %from, to = %to, "Purchase order transitioned");

        self.notify_status_change(po_id, from, to).await;

        Ok(model_to_response(updated))
    }

    /// Cancels the PO. Refused while a live invoice exists for it.
    #[instrument(skip(self), fields(purchase_order_id = %po_id))]
    pub async fn cancel(&self, po_id: Uuid) -> Result<PurchaseOrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let open_invoices = InvoiceEntity::find()
            .filter(invoice::Column::PurchaseOrderId.eq(po_id))
            .filter(invoice::Column::Status.ne(InvoiceStatus::Cancelled.to_string()))
            .count(db)
            .await
            .map_err(ServiceError::from_db)?;

        if open_invoices > 0 {
            return Err(ServiceError::InvalidOperation(
                "Cancel the invoice for this purchase order first".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let po = PurchaseOrderEntity::find_by_id(po_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))?;

        let from: PurchaseOrderStatus = parse_status(&po.status)?;
        ensure_purchase_order_transition(from, PurchaseOrderStatus::Cancelled)?;

        let mut active: PurchaseOrderActiveModel = po.into();
        active.status = Set(PurchaseOrderStatus::Cancelled.to_string());
        active.cancelled_at = Set(Some(now));
        active.updated_at = Set(Some(now));

        let updated = active.update(&txn).await.map_err(ServiceError::from_db)?;
        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(purchase_order_id = %po_id, "Purchase order cancelled");

        self.notify_status_change(po_id, from, PurchaseOrderStatus::Cancelled)
            .await;

        Ok(model_to_response(updated))
    }

    async fn notify_status_change(
        &self,
        po_id: Uuid,
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
    ) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PurchaseOrderStatusChanged {
                    purchase_order_id: po_id,
                    old_status: from.to_string(),
                    new_status: to.to_string(),
                })
                .await
            {
                warn!(error = %e, purchase_order_id = %po_id, "Failed to send PO status event");
            }
        }
    }
}

fn model_to_response(model: PurchaseOrderModel) -> PurchaseOrderResponse {
    PurchaseOrderResponse {
        id: model.id,
        po_number: model.po_number,
        order_id: model.order_id,
        status: model.status,
        net_terms: model.net_terms,
        notes: model.notes,
        completed_at: model.completed_at,
        cancelled_at: model.cancelled_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_terms_outside_range_are_rejected() {
        let request = CreatePurchaseOrderRequest {
            net_terms: Some(0),
            notes: None,
        };
        assert!(request.validate().is_err());

        let request = CreatePurchaseOrderRequest {
            net_terms: Some(400),
            notes: None,
        };
        assert!(request.validate().is_err());

        let request = CreatePurchaseOrderRequest {
            net_terms: Some(30),
            notes: None,
        };
        assert!(request.validate().is_ok());
    }
}
