use crate::{
    db::DbPool,
    entities::tax::{self, ActiveModel as TaxActiveModel, Entity as TaxEntity, Model as TaxModel},
    errors::ServiceError,
    events::{Event, EventSender},
    services::products::reprice_catalog,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTaxRequest {
    #[validate(length(min = 1, max = 60, message = "Tax name is required"))]
    pub name: String,
    /// Fraction, e.g. 0.11 for 11% VAT.
    pub rate: Decimal,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTaxRequest {
    #[validate(length(min = 1, max = 60, message = "Tax name cannot be empty"))]
    pub name: Option<String>,
    pub rate: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaxResponse {
    pub id: Uuid,
    pub name: String,
    pub rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct TaxService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl TaxService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a tax. Activating it deactivates every other tax and
    /// reprices the catalog, all in one transaction, so at most one tax
    /// is active at any time.
    #[instrument(skip(self, request), fields(tax_name = %request.name))]
    pub async fn create_tax(&self, request: CreateTaxRequest) -> Result<TaxResponse, ServiceError> {
        request.validate()?;
        validate_rate(request.rate)?;

        let db = &*self.db_pool;
        let tax_id = Uuid::new_v4();
        let now = Utc::now();
        let activate = request.is_active.unwrap_or(false);

        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        if activate {
            deactivate_all(&txn).await?;
        }

        let active = TaxActiveModel {
            id: Set(tax_id),
            name: Set(request.name.trim().to_string()),
            rate: Set(request.rate),
            is_active: Set(activate),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = active.insert(&txn).await.map_err(|e| {
            error!(error = %e, "Failed to create tax");
            ServiceError::from_db_on(e, "tax name")
        })?;

        if activate {
            reprice_catalog(&txn, model.rate).await?;
        }

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(tax_id = %tax_id, active = activate, "Tax created");

        if activate {
            self.notify_activation(tax_id).await;
        }

        Ok(model_to_response(model))
    }

    #[instrument(skip(self), fields(tax_id = %tax_id))]
    pub async fn get_tax(&self, tax_id: Uuid) -> Result<TaxResponse, ServiceError> {
        let db = &*self.db_pool;

        let tax = TaxEntity::find_by_id(tax_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Tax not found".to_string()))?;

        Ok(model_to_response(tax))
    }

    #[instrument(skip(self))]
    pub async fn list_taxes(&self) -> Result<Vec<TaxResponse>, ServiceError> {
        let db = &*self.db_pool;

        let taxes = TaxEntity::find()
            .order_by_desc(tax::Column::IsActive)
            .order_by_asc(tax::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(taxes.into_iter().map(model_to_response).collect())
    }

    /// The currently active tax, if any.
    #[instrument(skip(self))]
    pub async fn active_tax(&self) -> Result<Option<TaxResponse>, ServiceError> {
        let db = &*self.db_pool;

        let tax = TaxEntity::find()
            .filter(tax::Column::IsActive.eq(true))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        Ok(tax.map(model_to_response))
    }

    /// Updates a tax. Setting `is_active` keeps the single-active
    /// invariant; a rate change on the active tax reprices the catalog.
    #[instrument(skip(self, request), fields(tax_id = %tax_id))]
    pub async fn update_tax(
        &self,
        tax_id: Uuid,
        request: UpdateTaxRequest,
    ) -> Result<TaxResponse, ServiceError> {
        request.validate()?;
        if let Some(rate) = request.rate {
            validate_rate(rate)?;
        }

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(ServiceError::from_db)?;

        let tax = TaxEntity::find_by_id(tax_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Tax not found".to_string()))?;

        let was_active = tax.is_active;
        let will_activate = request.is_active.unwrap_or(was_active);

        if will_activate && !was_active {
            deactivate_all(&txn).await?;
        }

        let mut active: TaxActiveModel = tax.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(rate) = request.rate {
            active.rate = Set(rate);
        }
        active.is_active = Set(will_activate);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, tax_id = %tax_id, "Failed to update tax");
            ServiceError::from_db_on(e, "tax name")
        })?;

        // The effective rate changed: either by activation or by editing
        // the rate of the already-active tax.
        if will_activate && (!was_active || request.rate.is_some()) {
            reprice_catalog(&txn, updated.rate).await?;
        }

        txn.commit().await.map_err(ServiceError::from_db)?;

        info!(tax_id = %tax_id, active = will_activate, "Tax updated");

        if will_activate && !was_active {
            self.notify_activation(tax_id).await;
        }

        Ok(model_to_response(updated))
    }

    async fn notify_activation(&self, tax_id: Uuid) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::TaxActivated(tax_id)).await {
                warn!(error = %e, tax_id = %tax_id, "Failed to send tax activated event");
            }
        }
    }
}

fn validate_rate(rate: Decimal) -> Result<(), ServiceError> {
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(ServiceError::ValidationError(
            "Tax rate must be a fraction between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

async fn deactivate_all<C: ConnectionTrait>(db: &C) -> Result<(), ServiceError> {
    let actives = TaxEntity::find()
        .filter(tax::Column::IsActive.eq(true))
        .all(db)
        .await
        .map_err(ServiceError::from_db)?;

    for tax in actives {
        let mut active: TaxActiveModel = tax.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(ServiceError::from_db)?;
    }

    Ok(())
}

fn model_to_response(model: TaxModel) -> TaxResponse {
    TaxResponse {
        id: model.id,
        name: model.name,
        rate: model.rate,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
