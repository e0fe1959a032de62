use crate::{
    errors::ServiceError,
    handlers::AppState,
    pdf::{render_delivery_note_pdf, DeliveryNoteDocument},
    services::delivery_notes::{CreateDeliveryNoteRequest, MarkDeliveredRequest},
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeliveryNoteListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub status: Option<String>,
    pub invoice_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/delivery-notes",
    request_body = CreateDeliveryNoteRequest,
    responses(
        (status = 201, description = "Delivery note created in PENDING"),
        (status = 409, description = "The invoice already has a delivery note", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invoice is not a SENT PRODUCT invoice with delivery enabled", body = crate::errors::ErrorResponse)
    ),
    tag = "delivery-notes"
)]
pub async fn create_delivery_note(
    State(state): State<AppState>,
    Json(request): Json<CreateDeliveryNoteRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let note = state
        .services
        .delivery_notes
        .create_delivery_note(request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(note))))
}

async fn list_delivery_notes(
    State(state): State<AppState>,
    Query(query): Query<DeliveryNoteListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = state.page_params(query.page, query.limit);
    let notes = state
        .services
        .delivery_notes
        .list_delivery_notes(page, per_page, query.status, query.invoice_id)
        .await?;
    Ok(Json(ApiResponse::success(notes)))
}

async fn get_delivery_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let note = state.services.delivery_notes.get_delivery_note(id).await?;
    Ok(Json(ApiResponse::success(note)))
}

#[utoipa::path(
    post,
    path = "/api/v1/delivery-notes/{id}/deliver",
    params(("id" = Uuid, Path, description = "Delivery note id")),
    request_body = MarkDeliveredRequest,
    responses(
        (status = 200, description = "Goods delivered; a SENT invoice moves to DELIVERED"),
        (status = 422, description = "Delivery note is not PENDING", body = crate::errors::ErrorResponse)
    ),
    tag = "delivery-notes"
)]
pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MarkDeliveredRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let note = state
        .services
        .delivery_notes
        .mark_delivered(id, request)
        .await?;
    Ok(Json(ApiResponse::success(note)))
}

async fn cancel_delivery_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let note = state
        .services
        .delivery_notes
        .cancel_delivery_note(id)
        .await?;
    Ok(Json(ApiResponse::success(note)))
}

async fn delivery_note_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let note = state
        .services
        .delivery_notes
        .get_delivery_note_model(id)
        .await?;
    let (invoice, items) = state
        .services
        .invoices
        .get_invoice_model(note.invoice_id)
        .await?;
    let customer = state
        .services
        .customers
        .get_customer_model(invoice.customer_id)
        .await?;
    let profile = state.services.company_profile.get_profile_model().await?;

    let bytes = render_delivery_note_pdf(&DeliveryNoteDocument {
        company: profile.as_ref(),
        customer: &customer,
        note: &note,
        invoice_number: &invoice.invoice_number,
        items: &items,
    })?;

    let disposition = format!("inline; filename=\"{}.pdf\"", note.delivery_number);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

pub fn delivery_note_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_delivery_note))
        .route("/", get(list_delivery_notes))
        .route("/:id", get(get_delivery_note))
        .route("/:id/deliver", post(mark_delivered))
        .route("/:id/cancel", post(cancel_delivery_note))
        .route("/:id/pdf", get(delivery_note_pdf))
}
