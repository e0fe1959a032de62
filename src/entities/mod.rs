//! sea-orm entities for the trading-company schema.
//!
//! Status columns are plain strings at this layer; the typed state
//! machines and their transition rules live in `services::lifecycle`.

pub mod company_profile;
pub mod customer;
pub mod delivery_note;
pub mod field_visit;
pub mod invoice;
pub mod invoice_item;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod purchase_order;
pub mod sales_target;
pub mod swap;
pub mod swap_item;
pub mod tax;
pub mod user;
