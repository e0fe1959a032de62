// Domain rules shared by the services
pub mod lifecycle;
pub mod numbering;
pub mod pricing;

// Master data
pub mod company_profile;
pub mod customers;
pub mod products;
pub mod taxes;
pub mod users;

// Order-to-cash chain
pub mod delivery_notes;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod purchase_orders;
pub mod swaps;

// Sales operations and reporting
pub mod field_visits;
pub mod receivables;
pub mod sales_targets;
