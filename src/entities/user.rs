use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 3,
        max = 60,
        message = "Username must be between 3 and 60 characters"
    ))]
    pub username: String,

    /// Argon2 PHC string; never serialized in responses
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub full_name: String,
    /// One of ADMIN, FINANCE, SALES, WAREHOUSE
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    #[sea_orm(has_many = "super::field_visit::Entity")]
    FieldVisits,
    #[sea_orm(has_many = "super::sales_target::Entity")]
    SalesTargets,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::field_visit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FieldVisits.def()
    }
}

impl Related<super::sales_target::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesTargets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
