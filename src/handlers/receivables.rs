use crate::{errors::ServiceError, handlers::AppState, ApiResponse};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};

#[utoipa::path(
    get,
    path = "/api/v1/receivables",
    responses((status = 200, description = "Open invoices bucketed by days overdue")),
    tag = "receivables"
)]
pub async fn aging_report(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.receivables.aging_report().await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn aging_summary(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.receivables.aging_summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

pub fn receivable_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(aging_report))
        .route("/summary", get(aging_summary))
}
