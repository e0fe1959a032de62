use crate::{errors::ServiceError, handlers::AppState, ApiResponse};
use axum::{
    extract::{Json, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "pdf"];

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub filename: String,
    /// Path the file is served from, e.g. `/public/uploads/<name>`.
    pub path: String,
    pub size_bytes: usize,
}

/// Keeps only filesystem-safe characters so a crafted filename cannot
/// escape the upload directory.
fn sanitize_filename(input: &str) -> String {
    let name = input.rsplit(['/', '\\']).next().unwrap_or(input);
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.';
        out.push(if ok { ch } else { '_' });
    }
    let trimmed = out.trim_matches(['_', '.']).to_string();
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored, response carries its public path", body = UploadResponse),
        (status = 400, description = "Missing, oversized or unsupported file", body = crate::errors::ErrorResponse)
    ),
    tag = "uploads"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut original_filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ValidationError(format!("Multipart error: {}", e)))?
    {
        let name = field.name().map(|s| s.to_string());
        if name.as_deref() == Some("file") || name.as_deref() == Some("") {
            original_filename = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| {
                        ServiceError::ValidationError(format!("Failed to read upload: {}", e))
                    })?
                    .to_vec(),
            );
            break;
        }
    }

    let data = file_data
        .ok_or_else(|| ServiceError::ValidationError("No file field in the request".to_string()))?;

    if data.is_empty() {
        return Err(ServiceError::ValidationError(
            "The uploaded file is empty".to_string(),
        ));
    }
    if data.len() > state.config.upload_max_bytes {
        return Err(ServiceError::ValidationError(format!(
            "File is {} bytes, the limit is {}",
            data.len(),
            state.config.upload_max_bytes
        )));
    }

    let original = sanitize_filename(original_filename.as_deref().unwrap_or("file"));
    let extension = std::path::Path::new(&original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ServiceError::ValidationError(format!(
            "Unsupported file type: {}. Allowed: {}",
            if extension.is_empty() { "(none)" } else { &extension },
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    // Unique prefix so reuploads of the same name never collide
    let stored_name = format!("{}-{}", Uuid::new_v4().simple(), original);
    let dir = std::path::Path::new(&state.config.upload_dir);
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        ServiceError::InternalError(format!("Failed to prepare the upload directory: {}", e))
    })?;
    let path = dir.join(&stored_name);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| ServiceError::InternalError(format!("Failed to store the upload: {}", e)))?;

    info!(filename = %stored_name, size_bytes = data.len(), "File uploaded");

    let response = UploadResponse {
        filename: stored_name.clone(),
        path: format!("/public/uploads/{}", stored_name),
        size_bytes: data.len(),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/", post(upload_file))
}
