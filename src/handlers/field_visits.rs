use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::field_visits::{CreateFieldVisitRequest, UpdateFieldVisitRequest},
    ApiResponse,
};
use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct FieldVisitListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub sales_rep_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/field-visits",
    request_body = CreateFieldVisitRequest,
    responses(
        (status = 201, description = "Visit recorded against the authenticated rep"),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "field-visits"
)]
pub async fn create_field_visit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateFieldVisitRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let visit = state
        .services
        .field_visits
        .create_field_visit(request, user.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(visit))))
}

async fn list_field_visits(
    State(state): State<AppState>,
    Query(query): Query<FieldVisitListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = state.page_params(query.page, query.limit);
    let visits = state
        .services
        .field_visits
        .list_field_visits(page, per_page, query.sales_rep_id, query.customer_id)
        .await?;
    Ok(Json(ApiResponse::success(visits)))
}

async fn get_field_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let visit = state.services.field_visits.get_field_visit(id).await?;
    Ok(Json(ApiResponse::success(visit)))
}

async fn update_field_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateFieldVisitRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let visit = state
        .services
        .field_visits
        .update_field_visit(id, request)
        .await?;
    Ok(Json(ApiResponse::success(visit)))
}

async fn delete_field_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.field_visits.delete_field_visit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn field_visit_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_field_visit))
        .route("/", get(list_field_visits))
        .route("/:id", get(get_field_visit))
        .route("/:id", put(update_field_visit))
        .route("/:id", delete(delete_field_visit))
}
