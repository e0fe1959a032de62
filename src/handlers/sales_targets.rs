use crate::{
    errors::ServiceError,
    handlers::AppState,
    services::sales_targets::{CreateSalesTargetRequest, UpdateSalesTargetRequest},
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SalesTargetListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub user_id: Option<Uuid>,
    pub year: Option<i32>,
}

#[utoipa::path(
    post,
    path = "/api/v1/sales-targets",
    request_body = CreateSalesTargetRequest,
    responses(
        (status = 201, description = "Target set for the rep and period"),
        (status = 409, description = "A target already exists for that period", body = crate::errors::ErrorResponse)
    ),
    tag = "sales-targets"
)]
pub async fn create_sales_target(
    State(state): State<AppState>,
    Json(request): Json<CreateSalesTargetRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let target = state
        .services
        .sales_targets
        .create_sales_target(request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(target))))
}

async fn list_sales_targets(
    State(state): State<AppState>,
    Query(query): Query<SalesTargetListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = state.page_params(query.page, query.limit);
    let targets = state
        .services
        .sales_targets
        .list_sales_targets(page, per_page, query.user_id, query.year)
        .await?;
    Ok(Json(ApiResponse::success(targets)))
}

async fn get_sales_target(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let target = state.services.sales_targets.get_sales_target(id).await?;
    Ok(Json(ApiResponse::success(target)))
}

async fn update_sales_target(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSalesTargetRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let target = state
        .services
        .sales_targets
        .update_sales_target(id, request)
        .await?;
    Ok(Json(ApiResponse::success(target)))
}

async fn delete_sales_target(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.sales_targets.delete_sales_target(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/sales-targets/{id}/achievement",
    params(("id" = Uuid, Path, description = "Sales target id")),
    responses((status = 200, description = "Target vs achieved for the period, recomputed per call")),
    tag = "sales-targets"
)]
pub async fn get_achievement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let achievement = state.services.sales_targets.get_achievement(id).await?;
    Ok(Json(ApiResponse::success(achievement)))
}

pub fn sales_target_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_sales_target))
        .route("/", get(list_sales_targets))
        .route("/:id", get(get_sales_target))
        .route("/:id", put(update_sales_target))
        .route("/:id", delete(delete_sales_target))
        .route("/:id/achievement", get(get_achievement))
}
