pub mod auth;
pub mod company_profile;
pub mod customers;
pub mod delivery_notes;
pub mod field_visits;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod products;
pub mod purchase_orders;
pub mod receivables;
pub mod sales_targets;
pub mod swaps;
pub mod taxes;
pub mod uploads;
pub mod users;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub customers: Arc<crate::services::customers::CustomerService>,
    pub products: Arc<crate::services::products::ProductService>,
    pub taxes: Arc<crate::services::taxes::TaxService>,
    pub company_profile: Arc<crate::services::company_profile::CompanyProfileService>,
    pub users: Arc<crate::services::users::UserService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub purchase_orders: Arc<crate::services::purchase_orders::PurchaseOrderService>,
    pub invoices: Arc<crate::services::invoices::InvoiceService>,
    pub payments: Arc<crate::services::payments::PaymentService>,
    pub delivery_notes: Arc<crate::services::delivery_notes::DeliveryNoteService>,
    pub swaps: Arc<crate::services::swaps::SwapService>,
    pub receivables: Arc<crate::services::receivables::ReceivablesService>,
    pub field_visits: Arc<crate::services::field_visits::FieldVisitService>,
    pub sales_targets: Arc<crate::services::sales_targets::SalesTargetService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            customers: Arc::new(crate::services::customers::CustomerService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            products: Arc::new(crate::services::products::ProductService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            taxes: Arc::new(crate::services::taxes::TaxService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            company_profile: Arc::new(
                crate::services::company_profile::CompanyProfileService::new(db_pool.clone()),
            ),
            users: Arc::new(crate::services::users::UserService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            orders: Arc::new(crate::services::orders::OrderService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            purchase_orders: Arc::new(
                crate::services::purchase_orders::PurchaseOrderService::new(
                    db_pool.clone(),
                    event_sender.clone(),
                ),
            ),
            invoices: Arc::new(crate::services::invoices::InvoiceService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            payments: Arc::new(crate::services::payments::PaymentService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            delivery_notes: Arc::new(crate::services::delivery_notes::DeliveryNoteService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            swaps: Arc::new(crate::services::swaps::SwapService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            receivables: Arc::new(crate::services::receivables::ReceivablesService::new(
                db_pool.clone(),
            )),
            field_visits: Arc::new(crate::services::field_visits::FieldVisitService::new(
                db_pool.clone(),
                event_sender,
            )),
            sales_targets: Arc::new(crate::services::sales_targets::SalesTargetService::new(
                db_pool,
            )),
        }
    }
}
