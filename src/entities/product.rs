use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 60,
        message = "SKU must be between 1 and 60 characters"
    ))]
    pub sku: String,

    #[validate(length(
        min = 1,
        max = 160,
        message = "Product name must be between 1 and 160 characters"
    ))]
    pub name: String,

    /// Unit of sale (pcs, box, carton, ...)
    pub unit: String,

    /// Purchase cost before tax
    pub base_price: Decimal,

    /// Selling price, derived from base_price and the active tax
    pub selling_price: Decimal,

    pub stock_quantity: i32,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
