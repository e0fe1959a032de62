use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::orders::{CreateOrderRequest, OrderFilter},
    services::purchase_orders::CreatePurchaseOrderRequest,
    ApiResponse,
};
use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    /// Recorded in the order notes.
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub search: Option<String>,
    pub status: Option<String>,
    pub customer_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created in NEW"),
        (status = 404, description = "Customer or product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .create_order(request, user.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderListQuery),
    responses((status = 200, description = "Page of orders")),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = state.page_params(query.page, query.limit);
    let filter = OrderFilter {
        status: query.status,
        customer_id: query.customer_id,
        search: query.search,
    };
    let orders = state
        .services
        .orders
        .list_orders(page, per_page, filter)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn submit_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.submit_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn confirm_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.confirm_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .cancel_order(id, request.reason)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/purchase-order",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order generated"),
        (status = 409, description = "The order already has a purchase order", body = crate::errors::ErrorResponse),
        (status = 422, description = "Order is not PROCESSING", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let po = state
        .services
        .purchase_orders
        .create_for_order(id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(po))))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/submit", post(submit_order))
        .route("/:id/confirm", post(confirm_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/purchase-order", post(create_purchase_order))
}
