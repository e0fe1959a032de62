use crate::{
    errors::ServiceError,
    handlers::AppState,
    services::taxes::{CreateTaxRequest, UpdateTaxRequest},
    ApiResponse,
};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/taxes",
    request_body = CreateTaxRequest,
    responses(
        (status = 201, description = "Tax created; activating it deactivates every other tax and reprices the catalog")
    ),
    tag = "taxes"
)]
pub async fn create_tax(
    State(state): State<AppState>,
    Json(request): Json<CreateTaxRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let tax = state.services.taxes.create_tax(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(tax))))
}

async fn list_taxes(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let taxes = state.services.taxes.list_taxes().await?;
    Ok(Json(ApiResponse::success(taxes)))
}

async fn get_tax(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let tax = state.services.taxes.get_tax(id).await?;
    Ok(Json(ApiResponse::success(tax)))
}

async fn update_tax(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTaxRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let tax = state.services.taxes.update_tax(id, request).await?;
    Ok(Json(ApiResponse::success(tax)))
}

pub fn tax_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tax))
        .route("/", get(list_taxes))
        .route("/:id", get(get_tax))
        .route("/:id", put(update_tax))
}
