use crate::{
    db::DbPool,
    entities::company_profile::{
        ActiveModel as ProfileActiveModel, Entity as ProfileEntity, Model as ProfileModel,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::company_profile;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCompanyProfileRequest {
    #[validate(length(min = 1, max = 160, message = "Company name is required"))]
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// NPWP
    pub tax_id: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_account_holder: Option<String>,
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_id: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_account_holder: Option<String>,
    pub logo_path: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The company profile is a singleton row: the first row wins, updates
/// upsert it.
#[derive(Clone)]
pub struct CompanyProfileService {
    db_pool: Arc<DbPool>,
}

impl CompanyProfileService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self) -> Result<CompanyProfileResponse, ServiceError> {
        let db = &*self.db_pool;

        let profile = ProfileEntity::find()
            .order_by_asc(company_profile::Column::Id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| {
                ServiceError::NotFound("Company profile has not been configured".to_string())
            })?;

        Ok(model_to_response(profile))
    }

    /// Fetches the profile for document rendering; callers needing a
    /// response type use [`get_profile`](Self::get_profile).
    pub async fn get_profile_model(&self) -> Result<Option<ProfileModel>, ServiceError> {
        let db = &*self.db_pool;

        ProfileEntity::find()
            .order_by_asc(company_profile::Column::Id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)
    }

    #[instrument(skip(self, request), fields(company_name = %request.name))]
    pub async fn update_profile(
        &self,
        request: UpdateCompanyProfileRequest,
    ) -> Result<CompanyProfileResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let now = Utc::now();

        let existing = ProfileEntity::find()
            .order_by_asc(company_profile::Column::Id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        let model = match existing {
            Some(profile) => {
                let mut active: ProfileActiveModel = profile.into();
                active.name = Set(request.name.trim().to_string());
                active.address = Set(request.address);
                active.city = Set(request.city);
                active.phone = Set(request.phone);
                active.email = Set(request.email);
                active.tax_id = Set(request.tax_id);
                active.bank_name = Set(request.bank_name);
                active.bank_account_number = Set(request.bank_account_number);
                active.bank_account_holder = Set(request.bank_account_holder);
                active.logo_path = Set(request.logo_path);
                active.updated_at = Set(Some(now));
                active.update(db).await.map_err(|e| {
                    error!(error = %e, "Failed to update company profile");
                    ServiceError::from_db(e)
                })?
            }
            None => {
                let active = ProfileActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(request.name.trim().to_string()),
                    address: Set(request.address),
                    city: Set(request.city),
                    phone: Set(request.phone),
                    email: Set(request.email),
                    tax_id: Set(request.tax_id),
                    bank_name: Set(request.bank_name),
                    bank_account_number: Set(request.bank_account_number),
                    bank_account_holder: Set(request.bank_account_holder),
                    logo_path: Set(request.logo_path),
                    updated_at: Set(Some(now)),
                };
                active.insert(db).await.map_err(|e| {
                    error!(error = %e, "Failed to create company profile");
                    ServiceError::from_db(e)
                })?
            }
        };

        info!("Company profile saved");
        Ok(model_to_response(model))
    }
}

fn model_to_response(model: ProfileModel) -> CompanyProfileResponse {
    CompanyProfileResponse {
        id: model.id,
        name: model.name,
        address: model.address,
        city: model.city,
        phone: model.phone,
        email: model.email,
        tax_id: model.tax_id,
        bank_name: model.bank_name,
        bank_account_number: model.bank_account_number,
        bank_account_holder: model.bank_account_holder,
        logo_path: model.logo_path,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_request_requires_company_name() {
        let request = UpdateCompanyProfileRequest {
            name: "".to_string(),
            address: None,
            city: None,
            phone: None,
            email: None,
            tax_id: None,
            bank_name: None,
            bank_account_number: None,
            bank_account_holder: None,
            logo_path: None,
        };
        assert!(request.validate().is_err());
    }
}
