use crate::{
    errors::ServiceError, handlers::AppState,
    services::company_profile::UpdateCompanyProfileRequest, ApiResponse,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};

async fn get_profile(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let profile = state.services.company_profile.get_profile().await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn update_profile(
    State(state): State<AppState>,
    Json(request): Json<UpdateCompanyProfileRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let profile = state
        .services
        .company_profile
        .update_profile(request)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub fn company_profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile))
        .route("/", put(update_profile))
}
