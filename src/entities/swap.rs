use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tukar guling: replacement of invoiced goods with a value difference
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "swaps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub swap_number: String,
    pub invoice_id: Uuid,
    pub swap_date: DateTime<Utc>,
    /// Value of the goods taken back
    pub original_value: Decimal,
    /// Sum of the replacement item amounts
    pub replacement_value: Decimal,
    /// replacement_value - original_value
    pub value_difference: Decimal,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id"
    )]
    Invoice,
    #[sea_orm(has_many = "super::swap_item::Entity")]
    SwapItems,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl Related<super::swap_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SwapItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
