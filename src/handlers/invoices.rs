use crate::{
    errors::ServiceError,
    handlers::AppState,
    pdf::{render_invoice_pdf, InvoiceDocument},
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct InvoiceListQuery {
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
    pub search: Option<String>,
    pub customer_id: Option<Uuid>,
    /// Stored statuses plus the computed OVERDUE filter.
    pub status: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(InvoiceListQuery),
    responses((status = 200, description = "Page of invoices, OVERDUE computed at read time")),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoiceListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = state.page_params(query.page, query.limit);
    let filter = crate::services::invoices::InvoiceFilter {
        search: query.search,
        customer_id: query.customer_id,
        status: query.status,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let invoices = state
        .services
        .invoices
        .search_invoices(page, per_page, filter)
        .await?;
    Ok(Json(ApiResponse::success(invoices)))
}

async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoices.get_invoice(id).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

async fn send_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoices.send_invoice(id).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

async fn complete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoices.complete_invoice(id).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoices.cancel_invoice(id).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}/pdf",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "The faktur as a PDF", content_type = "application/pdf"),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn invoice_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let (invoice, items) = state.services.invoices.get_invoice_model(id).await?;
    let customer = state
        .services
        .customers
        .get_customer_model(invoice.customer_id)
        .await?;
    let profile = state.services.company_profile.get_profile_model().await?;

    let bytes = render_invoice_pdf(&InvoiceDocument {
        company: profile.as_ref(),
        customer: &customer,
        invoice: &invoice,
        items: &items,
    })?;

    let disposition = format!("inline; filename=\"{}.pdf\"", invoice.invoice_number);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

pub fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices))
        .route("/:id", get(get_invoice))
        .route("/:id/send", post(send_invoice))
        .route("/:id/complete", post(complete_invoice))
        .route("/:id/cancel", post(cancel_invoice))
        .route("/:id/pdf", get(invoice_pdf))
}
