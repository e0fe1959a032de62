use crate::{
    errors::ServiceError, handlers::AppState, services::payments::CreatePaymentRequest,
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
pub struct PaymentListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub invoice_id: Option<Uuid>,
    pub status: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded in PENDING"),
        (status = 422, description = "Invoice cannot take payments in its current status", body = crate::errors::ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state.services.payments.create_payment(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(payment))))
}

async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = state.page_params(query.page, query.limit);
    let payments = state
        .services
        .payments
        .list_payments(page, per_page, query.invoice_id, query.status)
        .await?;
    Ok(Json(ApiResponse::success(payments)))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state.services.payments.get_payment(id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/clear",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment cleared and applied to the invoice"),
        (status = 422, description = "Payment is not PENDING", body = crate::errors::ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn clear_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state.services.payments.clear_payment(id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

async fn reject_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state.services.payments.reject_payment(id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/", get(list_payments))
        .route("/:id", get(get_payment))
        .route("/:id/clear", post(clear_payment))
        .route("/:id/reject", post(reject_payment))
}
