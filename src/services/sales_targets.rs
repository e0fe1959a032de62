use crate::{
    db::DbPool,
    entities::invoice::{self, Entity as InvoiceEntity},
    entities::order::{self, Entity as OrderEntity},
    entities::purchase_order::{self, Entity as PurchaseOrderEntity},
    entities::sales_target::{
        self, ActiveModel as SalesTargetActiveModel, Entity as SalesTargetEntity,
        Model as SalesTargetModel,
    },
    entities::user::Entity as UserEntity,
    errors::ServiceError,
    services::lifecycle::InvoiceStatus,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSalesTargetRequest {
    pub user_id: Uuid,
    #[validate(range(min = 2000, max = 2100, message = "Year is out of range"))]
    pub year: i32,
    #[validate(range(min = 1, max = 12, message = "Month must be between 1 and 12"))]
    pub month: i32,
    pub target_amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSalesTargetRequest {
    pub target_amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SalesTargetResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub target_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SalesTargetListResponse {
    pub targets: Vec<SalesTargetResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Target vs. the invoiced value of the rep's orders in the period.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AchievementResponse {
    pub target: SalesTargetResponse,
    pub achieved_amount: Decimal,
    /// Percentage, two decimal places; zero when the target amount is zero.
    pub achievement_pct: Decimal,
}

#[derive(Clone)]
pub struct SalesTargetService {
    db_pool: Arc<DbPool>,
}

impl SalesTargetService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_sales_target(
        &self,
        request: CreateSalesTargetRequest,
    ) -> Result<SalesTargetResponse, ServiceError> {
        request.validate()?;
        if request.target_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Target amount cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;

        UserEntity::find_by_id(request.user_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let active = SalesTargetActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(request.user_id),
            year: Set(request.year),
            month: Set(request.month),
            target_amount: Set(request.target_amount),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let model = active
            .insert(db)
            .await
            .map_err(|e| ServiceError::from_db_on(e, "target period"))?;

        info!(target_id = %model.id, user_id = %model.user_id, year = model.year, month = model.month, "Sales target created");

        Ok(model_to_response(model))
    }

    #[instrument(skip(self), fields(target_id = %target_id))]
    pub async fn get_sales_target(
        &self,
        target_id: Uuid,
    ) -> Result<SalesTargetResponse, ServiceError> {
        Ok(model_to_response(self.load_target(target_id).await?))
    }

    #[instrument(skip(self))]
    pub async fn list_sales_targets(
        &self,
        page: u64,
        per_page: u64,
        user_id: Option<Uuid>,
        year: Option<i32>,
    ) -> Result<SalesTargetListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = SalesTargetEntity::find()
            .order_by_desc(sales_target::Column::Year)
            .order_by_desc(sales_target::Column::Month);
        if let Some(user_id) = user_id {
            query = query.filter(sales_target::Column::UserId.eq(user_id));
        }
        if let Some(year) = year {
            query = query.filter(sales_target::Column::Year.eq(year));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let targets = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(SalesTargetListResponse {
            targets: targets.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(target_id = %target_id))]
    pub async fn update_sales_target(
        &self,
        target_id: Uuid,
        request: UpdateSalesTargetRequest,
    ) -> Result<SalesTargetResponse, ServiceError> {
        if request.target_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Target amount cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let target = self.load_target(target_id).await?;
        let mut active: SalesTargetActiveModel = target.into();
        active.target_amount = Set(request.target_amount);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(ServiceError::from_db)?;
        Ok(model_to_response(updated))
    }

    #[instrument(skip(self), fields(target_id = %target_id))]
    pub async fn delete_sales_target(&self, target_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let result = SalesTargetEntity::delete_by_id(target_id)
            .exec(db)
            .await
            .map_err(ServiceError::from_db)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Sales target not found".to_string()));
        }

        info!(target_id = %target_id, "Sales target deleted");
        Ok(())
    }

    /// Achieved value = total of non-cancelled invoices dated in the target
    /// month whose order belongs to the target's rep. Recomputed per call,
    /// nothing stored.
    #[instrument(skip(self), fields(target_id = %target_id))]
    pub async fn get_achievement(
        &self,
        target_id: Uuid,
    ) -> Result<AchievementResponse, ServiceError> {
        let db = &*self.db_pool;

        let target = self.load_target(target_id).await?;
        let (period_start, period_end) = month_bounds(target.year, target.month)?;

        let order_ids: Vec<Uuid> = OrderEntity::find()
            .select_only()
            .column(order::Column::Id)
            .filter(order::Column::SalesRepId.eq(target.user_id))
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        let achieved_amount = if order_ids.is_empty() {
            Decimal::ZERO
        } else {
            let po_ids: Vec<Uuid> = PurchaseOrderEntity::find()
                .select_only()
                .column(purchase_order::Column::Id)
                .filter(purchase_order::Column::OrderId.is_in(order_ids))
                .into_tuple()
                .all(db)
                .await
                .map_err(ServiceError::from_db)?;

            if po_ids.is_empty() {
                Decimal::ZERO
            } else {
                let invoices = InvoiceEntity::find()
                    .filter(invoice::Column::PurchaseOrderId.is_in(po_ids))
                    .filter(invoice::Column::InvoiceDate.gte(period_start))
                    .filter(invoice::Column::InvoiceDate.lt(period_end))
                    .filter(invoice::Column::Status.ne(InvoiceStatus::Cancelled.to_string()))
                    .all(db)
                    .await
                    .map_err(ServiceError::from_db)?;

                invoices
                    .iter()
                    .map(|inv| inv.total_amount)
                    .sum::<Decimal>()
            }
        };

        let achievement_pct = if target.target_amount > Decimal::ZERO {
            (achieved_amount / target.target_amount * Decimal::ONE_HUNDRED).round_dp(2)
        } else {
            Decimal::ZERO
        };

        Ok(AchievementResponse {
            target: model_to_response(target),
            achieved_amount,
            achievement_pct,
        })
    }

    async fn load_target(&self, target_id: Uuid) -> Result<SalesTargetModel, ServiceError> {
        let db = &*self.db_pool;

        SalesTargetEntity::find_by_id(target_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Sales target not found".to_string()))
    }
}

fn month_bounds(year: i32, month: i32) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let invalid = || ServiceError::ValidationError("Invalid target period".to_string());
    let month = u32::try_from(month).map_err(|_| invalid())?;
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(invalid)?;
    Ok((
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

fn model_to_response(model: SalesTargetModel) -> SalesTargetResponse {
    SalesTargetResponse {
        id: model.id,
        user_id: model.user_id,
        year: model.year,
        month: model.month,
        target_amount: model.target_amount,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn month_must_be_in_calendar_range() {
        let request = CreateSalesTargetRequest {
            user_id: Uuid::new_v4(),
            year: 2026,
            month: 13,
            target_amount: dec!(250_000_000),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn month_bounds_cover_the_whole_month() {
        let (start, end) = month_bounds(2026, 12).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-12-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2027-01-01T00:00:00+00:00");
    }

    #[test]
    fn month_bounds_reject_month_zero() {
        assert!(month_bounds(2026, 0).is_err());
    }
}
