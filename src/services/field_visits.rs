use crate::{
    db::DbPool,
    entities::customer::Entity as CustomerEntity,
    entities::field_visit::{
        self, ActiveModel as FieldVisitActiveModel, Entity as FieldVisitEntity,
        Model as FieldVisitModel,
    },
    errors::ServiceError,
    events::EventSender,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateFieldVisitRequest {
    pub customer_id: Uuid,
    pub visit_date: Option<DateTime<Utc>>,
    #[validate(length(max = 200, message = "Purpose is too long"))]
    pub purpose: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateFieldVisitRequest {
    pub visit_date: Option<DateTime<Utc>>,
    #[validate(length(max = 200, message = "Purpose is too long"))]
    pub purpose: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FieldVisitResponse {
    pub id: Uuid,
    pub sales_rep_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub visit_date: DateTime<Utc>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FieldVisitListResponse {
    pub visits: Vec<FieldVisitResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct FieldVisitService {
    db_pool: Arc<DbPool>,
    #[allow(dead_code)]
    event_sender: Option<Arc<EventSender>>,
}

impl FieldVisitService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// The visit is recorded against the authenticated sales rep.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, sales_rep_id = %sales_rep_id))]
    pub async fn create_field_visit(
        &self,
        request: CreateFieldVisitRequest,
        sales_rep_id: Uuid,
    ) -> Result<FieldVisitResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let visit_id = Uuid::new_v4();
        let now = Utc::now();

        let customer = CustomerEntity::find_by_id(request.customer_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;

        let active = FieldVisitActiveModel {
            id: Set(visit_id),
            sales_rep_id: Set(sales_rep_id),
            customer_id: Set(request.customer_id),
            visit_date: Set(request.visit_date.unwrap_or(now)),
            purpose: Set(request.purpose),
            notes: Set(request.notes),
            created_at: Set(now),
        };

        let model = active.insert(db).await.map_err(ServiceError::from_db)?;

        info!(visit_id = %visit_id, customer_id = %request.customer_id, "Field visit recorded");

        Ok(model_to_response(model, Some(customer.name)))
    }

    #[instrument(skip(self), fields(visit_id = %visit_id))]
    pub async fn get_field_visit(&self, visit_id: Uuid) -> Result<FieldVisitResponse, ServiceError> {
        let db = &*self.db_pool;

        let (visit, customer) = FieldVisitEntity::find_by_id(visit_id)
            .find_also_related(CustomerEntity)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Field visit not found".to_string()))?;

        Ok(model_to_response(visit, customer.map(|c| c.name)))
    }

    #[instrument(skip(self))]
    pub async fn list_field_visits(
        &self,
        page: u64,
        per_page: u64,
        sales_rep_id: Option<Uuid>,
        customer_id: Option<Uuid>,
    ) -> Result<FieldVisitListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = FieldVisitEntity::find()
            .find_also_related(CustomerEntity)
            .order_by_desc(field_visit::Column::VisitDate);
        if let Some(sales_rep_id) = sales_rep_id {
            query = query.filter(field_visit::Column::SalesRepId.eq(sales_rep_id));
        }
        if let Some(customer_id) = customer_id {
            query = query.filter(field_visit::Column::CustomerId.eq(customer_id));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let visits = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(FieldVisitListResponse {
            visits: visits
                .into_iter()
                .map(|(visit, customer)| model_to_response(visit, customer.map(|c| c.name)))
                .collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(visit_id = %visit_id))]
    pub async fn update_field_visit(
        &self,
        visit_id: Uuid,
        request: UpdateFieldVisitRequest,
    ) -> Result<FieldVisitResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let visit = FieldVisitEntity::find_by_id(visit_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Field visit not found".to_string()))?;

        let customer_id = visit.customer_id;
        let mut active: FieldVisitActiveModel = visit.into();
        if let Some(visit_date) = request.visit_date {
            active.visit_date = Set(visit_date);
        }
        if request.purpose.is_some() {
            active.purpose = Set(request.purpose);
        }
        if request.notes.is_some() {
            active.notes = Set(request.notes);
        }

        let updated = active.update(db).await.map_err(ServiceError::from_db)?;

        let customer = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(model_to_response(updated, customer.map(|c| c.name)))
    }

    #[instrument(skip(self), fields(visit_id = %visit_id))]
    pub async fn delete_field_visit(&self, visit_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let result = FieldVisitEntity::delete_by_id(visit_id)
            .exec(db)
            .await
            .map_err(ServiceError::from_db)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Field visit not found".to_string()));
        }

        info!(visit_id = %visit_id, "Field visit deleted");
        Ok(())
    }
}

fn model_to_response(model: FieldVisitModel, customer_name: Option<String>) -> FieldVisitResponse {
    FieldVisitResponse {
        id: model.id,
        sales_rep_id: model.sales_rep_id,
        customer_id: model.customer_id,
        customer_name,
        visit_date: model.visit_date,
        purpose: model.purpose,
        notes: model.notes,
        created_at: model.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_length_is_bounded() {
        let request = CreateFieldVisitRequest {
            customer_id: Uuid::new_v4(),
            visit_date: None,
            purpose: Some("x".repeat(201)),
            notes: None,
        };
        assert!(request.validate().is_err());
    }
}
