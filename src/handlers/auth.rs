use crate::{
    auth::{AuthUser, TokenResponse},
    errors::ServiceError,
    handlers::AppState,
    services::users::UserResponse,
    ApiResponse,
};
use axum::{
    extract::{Extension, Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: TokenResponse,
    pub user: UserResponse,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued"),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let user = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;
    let token = state.auth_service.issue_token(&user)?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        user: user.into(),
    })))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The authenticated user"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let profile = state.services.users.get_user(user.user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Routes that require no token (login).
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Routes behind the auth middleware.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}
