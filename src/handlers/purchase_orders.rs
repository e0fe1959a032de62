use crate::{
    errors::ServiceError,
    handlers::AppState,
    services::invoices::GenerateInvoiceRequest,
    services::purchase_orders::UpdatePurchaseOrderStatusRequest,
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PurchaseOrderListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub search: Option<String>,
    pub status: Option<String>,
}

async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(query): Query<PurchaseOrderListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = state.page_params(query.page, query.limit);
    let purchase_orders = state
        .services
        .purchase_orders
        .list_purchase_orders(page, per_page, query.status, query.search)
        .await?;
    Ok(Json(ApiResponse::success(purchase_orders)))
}

async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let po = state.services.purchase_orders.get_purchase_order(id).await?;
    Ok(Json(ApiResponse::success(po)))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/status",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = UpdatePurchaseOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated; completing the PO also completes its order"),
        (status = 422, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePurchaseOrderStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let po = state
        .services
        .purchase_orders
        .update_status(id, request)
        .await?;
    Ok(Json(ApiResponse::success(po)))
}

async fn cancel_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let po = state.services.purchase_orders.cancel(id).await?;
    Ok(Json(ApiResponse::success(po)))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/invoice",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = GenerateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice generated from the purchase order"),
        (status = 409, description = "The purchase order already has an invoice", body = crate::errors::ErrorResponse),
        (status = 422, description = "Purchase order is still PENDING", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateInvoiceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state
        .services
        .invoices
        .create_for_purchase_order(id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(invoice))))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .route("/:id/status", post(update_status))
        .route("/:id/cancel", post(cancel_purchase_order))
        .route("/:id/invoice", post(create_invoice))
}
