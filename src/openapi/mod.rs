use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Niaga API",
        version = "1.0.0",
        description = r#"
# Niaga Sales Administration API

Back-office API for a wholesale distributor: the order-to-cash chain from
customer order through purchase order, invoice, delivery and payment, plus
receivables, swaps and sales-team tracking.

## Features

- **Orders**: Customer orders with line items, submitted and confirmed by the sales team
- **Purchase Orders**: One per order, driving fulfilment through to completion
- **Invoices**: PRODUCT or SERVICE faktur with PPN tax, discounts, shipping and NET terms
- **Payments**: Pending/cleared/rejected payments applied against invoices
- **Delivery Notes**: Surat jalan for PRODUCT invoices, printable without prices
- **Receivables**: Aging buckets over open invoices
- **Swaps**: Goods exchanges recorded against returned invoices
- **Field Visits & Sales Targets**: Rep activity and monthly quota tracking
- **PDF documents**: Invoices and delivery notes rendered server-side

## Authentication

All `/api/v1` endpoints require a JWT obtained from `POST /auth/login`. Include
the token in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

Role-based access applies per resource (ADMIN, FINANCE, SALES, WAREHOUSE).

## Error Handling

The API uses a consistent error envelope with appropriate HTTP status codes:

```json
{
  "success": false,
  "error": "Not found: Invoice not found",
  "request_id": "req-abc123",
  "timestamp": "2026-01-01T00:00:00Z"
}
```

## Pagination

List endpoints support pagination with the following query parameters:
- `page`: Page number (default: 1)
- `limit`: Items per page (default: 20, max: 100)
- `search`: Search term for filtering results
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Login and session endpoints"),
        (name = "users", description = "User administration"),
        (name = "customers", description = "Customer management"),
        (name = "products", description = "Product catalog"),
        (name = "taxes", description = "Tax rates and repricing"),
        (name = "orders", description = "Customer order lifecycle"),
        (name = "purchase-orders", description = "Fulfilment lifecycle"),
        (name = "invoices", description = "Invoicing and PDF documents"),
        (name = "payments", description = "Payment recording and clearing"),
        (name = "delivery-notes", description = "Surat jalan lifecycle"),
        (name = "swaps", description = "Goods exchange records"),
        (name = "receivables", description = "Accounts receivable aging"),
        (name = "field-visits", description = "Sales rep visit log"),
        (name = "sales-targets", description = "Monthly targets and achievement"),
        (name = "uploads", description = "File uploads")
    ),
    paths(
        // Auth
        crate::handlers::auth::login,
        crate::handlers::auth::me,

        // Users
        crate::handlers::users::create_user,
        crate::handlers::users::delete_user,

        // Customers
        crate::handlers::customers::create_customer,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::delete_customer,

        // Catalog
        crate::handlers::products::create_product,
        crate::handlers::taxes::create_tax,

        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_purchase_order,

        // Purchase orders
        crate::handlers::purchase_orders::update_status,
        crate::handlers::purchase_orders::create_invoice,

        // Invoices
        crate::handlers::invoices::list_invoices,
        crate::handlers::invoices::invoice_pdf,

        // Payments
        crate::handlers::payments::create_payment,
        crate::handlers::payments::clear_payment,

        // Delivery notes
        crate::handlers::delivery_notes::create_delivery_note,
        crate::handlers::delivery_notes::mark_delivered,

        // Swaps
        crate::handlers::swaps::create_swap,

        // Receivables
        crate::handlers::receivables::aging_report,

        // Field visits and targets
        crate::handlers::field_visits::create_field_visit,
        crate::handlers::sales_targets::create_sales_target,
        crate::handlers::sales_targets::get_achievement,

        // Uploads
        crate::handlers::uploads::upload_file,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::ListQuery,
            crate::errors::ErrorResponse,

            // Auth types
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::auth::TokenResponse,
            crate::auth::AuthUser,
            crate::auth::permissions::Role,

            // User types
            crate::services::users::CreateUserRequest,
            crate::services::users::UpdateUserRequest,
            crate::services::users::UserResponse,

            // Customer types
            crate::services::customers::CreateCustomerRequest,
            crate::services::customers::UpdateCustomerRequest,
            crate::services::customers::CustomerResponse,

            // Catalog types
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::products::ProductResponse,
            crate::services::taxes::CreateTaxRequest,
            crate::services::taxes::UpdateTaxRequest,
            crate::services::taxes::TaxResponse,
            crate::services::company_profile::UpdateCompanyProfileRequest,
            crate::services::company_profile::CompanyProfileResponse,

            // Order types
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderItemInput,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderItemResponse,
            crate::services::orders::OrderListResponse,
            crate::handlers::orders::CancelOrderRequest,

            // Purchase order types
            crate::services::purchase_orders::CreatePurchaseOrderRequest,
            crate::services::purchase_orders::UpdatePurchaseOrderStatusRequest,
            crate::services::purchase_orders::PurchaseOrderResponse,
            crate::services::purchase_orders::PurchaseOrderListResponse,

            // Invoice types
            crate::services::invoices::GenerateInvoiceRequest,
            crate::services::invoices::InvoiceResponse,
            crate::services::invoices::InvoiceItemResponse,
            crate::services::invoices::InvoiceListResponse,

            // Payment types
            crate::services::payments::CreatePaymentRequest,
            crate::services::payments::PaymentResponse,
            crate::services::payments::PaymentListResponse,

            // Delivery note types
            crate::services::delivery_notes::CreateDeliveryNoteRequest,
            crate::services::delivery_notes::MarkDeliveredRequest,
            crate::services::delivery_notes::DeliveryNoteResponse,
            crate::services::delivery_notes::DeliveryNoteListResponse,

            // Swap types
            crate::services::swaps::SwapItemInput,
            crate::services::swaps::CreateSwapRequest,
            crate::services::swaps::SwapItemResponse,
            crate::services::swaps::SwapResponse,

            // Receivables types
            crate::services::receivables::AgingInvoice,
            crate::services::receivables::CustomerReceivables,
            crate::services::receivables::AgingSummary,
            crate::services::receivables::AgingReport,

            // Field visit and target types
            crate::services::field_visits::CreateFieldVisitRequest,
            crate::services::field_visits::UpdateFieldVisitRequest,
            crate::services::field_visits::FieldVisitResponse,
            crate::services::sales_targets::CreateSalesTargetRequest,
            crate::services::sales_targets::UpdateSalesTargetRequest,
            crate::services::sales_targets::SalesTargetResponse,
            crate::services::sales_targets::AchievementResponse,

            // Upload types
            crate::handlers::uploads::UploadResponse,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_covers_the_core_surface() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Niaga API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/invoices/{id}/pdf"));
        assert!(json.contains("/auth/login"));
    }
}
