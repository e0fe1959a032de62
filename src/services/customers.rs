use crate::{
    db::DbPool,
    entities::customer::{
        self, ActiveModel as CustomerActiveModel, Entity as CustomerEntity, Model as CustomerModel,
    },
    entities::invoice::{self, Entity as InvoiceEntity},
    entities::order::{self, Entity as OrderEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 120, message = "Customer name is required"))]
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 120, message = "Customer name cannot be empty"))]
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(customer_name = %request.name))]
    pub async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<CustomerResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let customer_id = Uuid::new_v4();
        let now = Utc::now();

        let active = CustomerActiveModel {
            id: Set(customer_id),
            name: Set(request.name.trim().to_string()),
            contact_person: Set(request.contact_person),
            phone: Set(request.phone),
            email: Set(request.email),
            address: Set(request.address),
            city: Set(request.city),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = active.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create customer");
            ServiceError::from_db_on(e, "customer name")
        })?;

        info!(customer_id = %customer_id, "Customer created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::CustomerCreated(customer_id)).await {
                warn!(error = %e, customer_id = %customer_id, "Failed to send customer created event");
            }
        }

        Ok(model_to_response(model))
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<CustomerResponse, ServiceError> {
        let db = &*self.db_pool;

        let customer = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;

        Ok(model_to_response(customer))
    }

    /// Fetches the raw model for document rendering.
    pub async fn get_customer_model(
        &self,
        customer_id: Uuid,
    ) -> Result<CustomerModel, ServiceError> {
        let db = &*self.db_pool;

        CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<CustomerListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = CustomerEntity::find().order_by_asc(customer::Column::Name);
        if let Some(term) = search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(customer::Column::Name.contains(term.trim()));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let customers = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(CustomerListResponse {
            customers: customers.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, request), fields(customer_id = %customer_id))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<CustomerResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let customer = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;

        let mut active: CustomerActiveModel = customer.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(contact_person) = request.contact_person {
            active.contact_person = Set(Some(contact_person));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(city) = request.city {
            active.city = Set(Some(city));
        }
        if let Some(notes) = request.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, customer_id = %customer_id, "Failed to update customer");
            ServiceError::from_db_on(e, "customer name")
        })?;

        info!(customer_id = %customer_id, "Customer updated");
        Ok(model_to_response(updated))
    }

    /// Deletes a customer. Refused while any order or invoice still
    /// references the customer.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let customer = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;

        let order_count = OrderEntity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .count(db)
            .await
            .map_err(ServiceError::from_db)?;

        let invoice_count = InvoiceEntity::find()
            .filter(invoice::Column::CustomerId.eq(customer_id))
            .count(db)
            .await
            .map_err(ServiceError::from_db)?;

        if order_count > 0 || invoice_count > 0 {
            warn!(
                customer_id = %customer_id,
                orders = order_count,
                invoices = invoice_count,
                "Refusing to delete referenced customer"
            );
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot delete customer '{}': {} order(s) and {} invoice(s) reference it",
                customer.name, order_count, invoice_count
            )));
        }

        CustomerEntity::delete_by_id(customer_id)
            .exec(db)
            .await
            .map_err(ServiceError::from_db)?;

        info!(customer_id = %customer_id, "Customer deleted");
        Ok(())
    }
}

fn model_to_response(model: CustomerModel) -> CustomerResponse {
    CustomerResponse {
        id: model.id,
        name: model.name,
        contact_person: model.contact_person,
        phone: model.phone,
        email: model.email,
        address: model.address,
        city: model.city,
        notes: model.notes,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_a_name() {
        let request = CreateCustomerRequest {
            name: "".to_string(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
            city: None,
            notes: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn create_request_rejects_invalid_email() {
        let request = CreateCustomerRequest {
            name: "Toko Sinar Jaya".to_string(),
            contact_person: None,
            phone: None,
            email: Some("not-an-email".to_string()),
            address: None,
            city: None,
            notes: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn model_to_response_keeps_all_fields() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let model = CustomerModel {
            id,
            name: "Warung Berkah".to_string(),
            contact_person: Some("Ibu Sari".to_string()),
            phone: Some("0812-3456-7890".to_string()),
            email: None,
            address: Some("Jl. Melati 5".to_string()),
            city: Some("Bandung".to_string()),
            notes: None,
            created_at: now,
            updated_at: None,
        };

        let response = model_to_response(model);
        assert_eq!(response.id, id);
        assert_eq!(response.name, "Warung Berkah");
        assert_eq!(response.city.as_deref(), Some("Bandung"));
        assert_eq!(response.created_at, now);
    }
}
