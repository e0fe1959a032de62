use crate::{
    errors::ServiceError, handlers::AppState, services::swaps::CreateSwapRequest, ApiResponse,
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
pub struct SwapListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub invoice_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/swaps",
    request_body = CreateSwapRequest,
    responses(
        (status = 201, description = "Swap recorded, invoice moved to RETURNED"),
        (status = 422, description = "Invoice is already terminal", body = crate::errors::ErrorResponse)
    ),
    tag = "swaps"
)]
pub async fn create_swap(
    State(state): State<AppState>,
    Json(request): Json<CreateSwapRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let swap = state.services.swaps.create_swap(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(swap))))
}

async fn list_swaps(
    State(state): State<AppState>,
    Query(query): Query<SwapListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = state.page_params(query.page, query.limit);
    let swaps = state
        .services
        .swaps
        .list_swaps(page, per_page, query.invoice_id)
        .await?;
    Ok(Json(ApiResponse::success(swaps)))
}

async fn get_swap(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let swap = state.services.swaps.get_swap(id).await?;
    Ok(Json(ApiResponse::success(swap)))
}

pub fn swap_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_swap))
        .route("/", get(list_swaps))
        .route("/:id", get(get_swap))
}
