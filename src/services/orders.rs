use crate::{
    db::DbPool,
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
    },
    entities::order_item::{
        self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
        Model as OrderItemModel,
    },
    entities::product::Entity as ProductEntity,
    entities::purchase_order::{self, Entity as PurchaseOrderEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::lifecycle::{ensure_order_transition, parse_status, OrderStatus},
    services::numbering::{document_number, ORDER_PREFIX},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
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
pub struct OrderItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Overrides the catalog selling price when set.
    pub unit_price: Option<Decimal>,
    /// Overrides the product name on the document when set.
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    /// Defaults to the authenticated user.
    pub sales_rep_id: Option<Uuid>,
    pub order_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub sales_rep_id: Uuid,
    pub status: String,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Loaded on the detail endpoint; empty in list responses.
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub customer_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates an order in NEW with its line items. Item prices default to
    /// the product's current selling price; the description is snapshotted
    /// so later catalog edits do not rewrite history.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        default_sales_rep: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let order_date = request.order_date.unwrap_or(now);
        let sales_rep_id = request.sales_rep_id.unwrap_or(default_sales_rep);

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let mut total_amount = Decimal::ZERO;
        let mut item_models: Vec<OrderItemActiveModel> = Vec::with_capacity(request.items.len());

        for item in &request.items {
            item.validate()?;
            let product = ProductEntity::find_by_id(item.product_id)
                .one(&txn)
                .await
                .map_err(ServiceError::from_db)?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "Product {} does not exist",
                        item.product_id
                    ))
                })?;

            if !product.is_active {
                return Err(ServiceError::ValidationError(format!(
                    "Product '{}' is inactive",
                    product.name
                )));
            }

            let unit_price = item.unit_price.unwrap_or(product.selling_price);
            if unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Unit price cannot be negative".to_string(),
                ));
            }
            let amount = unit_price * Decimal::from(item.quantity);
            total_amount += amount;

            item_models.push(OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                description: Set(item
                    .description
                    .clone()
                    .unwrap_or_else(|| product.name.clone())),
                quantity: Set(item.quantity),
                unit_price: Set(unit_price),
                amount: Set(amount),
                created_at: Set(now),
            });
        }

        let order_active = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(document_number(ORDER_PREFIX, order_date)),
            customer_id: Set(request.customer_id),
            sales_rep_id: Set(sales_rep_id),
            status: Set(OrderStatus::New.to_string()),
            order_date: Set(order_date),
            total_amount: Set(total_amount),
            notes: Set(request.notes),
            confirmed_at: Set(None),
            completed_at: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let order_model = order_active.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create order");
            ServiceError::from_db_on(e, "order number")
        })?;

        for item in item_models {
            item.insert(&txn).await.map_err(ServiceError::from_db)?;
        }

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(order_id = %order_id, total = %total_amount, "Order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order created event");
            }
        }

        self.load_response(order_model).await
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        self.load_response(order).await
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        filter: OrderFilter,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = OrderEntity::find().order_by_desc(order::Column::OrderDate);
        if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
            // Reject unknown values instead of silently matching nothing
            let status: OrderStatus = parse_status(status)?;
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(order::Column::OrderNumber.contains(term.trim()));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(OrderListResponse {
            orders: orders
                .into_iter()
                .map(|o| model_to_response(o, Vec::new()))
                .collect(),
            total,
            page,
            per_page,
        })
    }

    /// NEW → PENDING_CONFIRMATION: the rep hands the order over for
    /// confirmation.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn submit_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        self.transition(order_id, OrderStatus::PendingConfirmation, |_, _| {})
            .await
    }

    /// NEW/PENDING_CONFIRMATION → PROCESSING, stamping `confirmed_at`.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn confirm_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        self.transition(order_id, OrderStatus::Processing, |active, now| {
            active.confirmed_at = Set(Some(now));
        })
        .await
    }

    /// Cancels the order. Refused while a live purchase order exists; the
    /// PO must be cancelled first so the chain never dangles.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let open_po = PurchaseOrderEntity::find()
            .filter(purchase_order::Column::OrderId.eq(order_id))
            .filter(
                purchase_order::Column::Status.is_not_in([
                    crate::services::lifecycle::PurchaseOrderStatus::Cancelled.to_string(),
                ]),
            )
            .count(db)
            .await
            .map_err(ServiceError::from_db)?;

        if open_po > 0 {
            return Err(ServiceError::InvalidOperation(
                "Cancel the purchase order for this order first".to_string(),
            ));
        }

        self.transition(order_id, OrderStatus::Cancelled, move |active, now| {
            active.cancelled_at = Set(Some(now));
            if let Some(reason) = reason.clone() {
                active.notes = Set(Some(reason));
            }
        })
        .await
    }

    /// Shared transition plumbing: load, check the table, apply stamps,
    /// persist, emit the status event.
    async fn transition<F>(
        &self,
        order_id: Uuid,
        to: OrderStatus,
        apply: F,
    ) -> Result<OrderResponse, ServiceError>
    where
        F: Fn(&mut OrderActiveModel, DateTime<Utc>),
    {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let from: OrderStatus = parse_status(&order.status)?;
        ensure_order_transition(from, to)?;

        let mut active: OrderActiveModel = order.into();
        active.status = Set(to.to_string());
        active.updated_at = Set(Some(now));
        apply(&mut active, now);

        let updated = active.update(&txn).await.map_err(ServiceError::from_db)?;
        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(order_id = %order_id, from = %from, to = %to, "Order transitioned");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status: from.to_string(),
                    new_status: to.to_string(),
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send order status event");
            }
        }

        self.load_response(updated).await
    }

    async fn load_response(&self, order: OrderModel) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(model_to_response(order, items))
    }
}

fn model_to_response(order: OrderModel, items: Vec<OrderItemModel>) -> OrderResponse {
    OrderResponse {
        id: order.id,
        order_number: order.order_number,
        customer_id: order.customer_id,
        sales_rep_id: order.sales_rep_id,
        status: order.status,
        order_date: order.order_date,
        total_amount: order.total_amount,
        notes: order.notes,
        confirmed_at: order.confirmed_at,
        completed_at: order.completed_at,
        cancelled_at: order.cancelled_at,
        created_at: order.created_at,
        updated_at: order.updated_at,
        items: items
            .into_iter()
            .map(|item| OrderItemResponse {
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
    fn create_request_rejects_empty_item_list() {
        let request = CreateOrderRequest {
            customer_id: Uuid::new_v4(),
            sales_rep_id: None,
            order_date: None,
            notes: None,
            items: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn item_input_rejects_zero_quantity() {
        let item = OrderItemInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
            unit_price: None,
            description: None,
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn model_to_response_carries_items_and_totals() {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order = OrderModel {
            id: order_id,
            order_number: "ORD-20240615-A1B2C3".to_string(),
            customer_id: Uuid::new_v4(),
            sales_rep_id: Uuid::new_v4(),
            status: "NEW".to_string(),
            order_date: now,
            total_amount: dec!(32_000),
            notes: None,
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: None,
        };
        let items = vec![OrderItemModel {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            description: "Minyak Goreng 1L".to_string(),
            quantity: 2,
            unit_price: dec!(16_000),
            amount: dec!(32_000),
            created_at: now,
        }];

        let response = model_to_response(order, items);
        assert_eq!(response.status, "NEW");
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].amount, dec!(32_000));
        assert_eq!(response.total_amount, dec!(32_000));
    }
}
