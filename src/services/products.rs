use crate::{
    db::DbPool,
    entities::product::{
        self, ActiveModel as ProductActiveModel, Entity as ProductEntity, Model as ProductModel,
    },
    entities::tax::{self, Entity as TaxEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::pricing,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 60, message = "SKU is required"))]
    pub sku: String,
    #[validate(length(min = 1, max = 160, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "Unit is required"))]
    pub unit: String,
    pub base_price: Decimal,
    pub stock_quantity: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 160, message = "Product name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Unit cannot be empty"))]
    pub unit: Option<String>,
    pub base_price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub base_price: Decimal,
    pub selling_price: Decimal,
    pub stock_quantity: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a product, deriving its selling price from the active tax.
    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let tax_rate = active_tax_rate(db).await?;
        pricing::validate_pricing_inputs(request.base_price, tax_rate)?;

        let product_id = Uuid::new_v4();
        let now = Utc::now();

        let active = ProductActiveModel {
            id: Set(product_id),
            sku: Set(request.sku.trim().to_uppercase()),
            name: Set(request.name.trim().to_string()),
            unit: Set(request.unit.trim().to_string()),
            base_price: Set(request.base_price),
            selling_price: Set(pricing::selling_price(request.base_price, tax_rate)),
            stock_quantity: Set(request.stock_quantity.unwrap_or(0)),
            description: Set(request.description),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let model = active.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create product");
            ServiceError::from_db_on(e, "SKU")
        })?;

        info!(product_id = %product_id, sku = %model.sku, "Product created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::ProductCreated(product_id)).await {
                warn!(error = %e, product_id = %product_id, "Failed to send product created event");
            }
        }

        Ok(model_to_response(model))
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductResponse, ServiceError> {
        let db = &*self.db_pool;

        let product = ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        Ok(model_to_response(product))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<ProductListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = ProductEntity::find().order_by_asc(product::Column::Name);
        if let Some(term) = search.as_deref().filter(|s| !s.trim().is_empty()) {
            let term = term.trim();
            query = query.filter(
                product::Column::Name
                    .contains(term)
                    .or(product::Column::Sku.contains(term)),
            );
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let products = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(ProductListResponse {
            products: products.into_iter().map(model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Updates a product. A base price change reprices against the active
    /// tax at update time.
    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let product = ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let mut active: ProductActiveModel = product.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit.trim().to_string());
        }
        if let Some(base_price) = request.base_price {
            let tax_rate = active_tax_rate(db).await?;
            pricing::validate_pricing_inputs(base_price, tax_rate)?;
            active.base_price = Set(base_price);
            active.selling_price = Set(pricing::selling_price(base_price, tax_rate));
        }
        if let Some(stock_quantity) = request.stock_quantity {
            active.stock_quantity = Set(stock_quantity);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, product_id = %product_id, "Failed to update product");
            ServiceError::from_db_on(e, "SKU")
        })?;

        info!(product_id = %product_id, "Product updated");
        Ok(model_to_response(updated))
    }

    /// Deletes a product that is no longer sold. Rows referencing it from
    /// historic order items keep their snapshot description and price.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let result = ProductEntity::delete_by_id(product_id)
            .exec(db)
            .await
            .map_err(ServiceError::from_db)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }

        info!(product_id = %product_id, "Product deleted");
        Ok(())
    }
}

/// Recomputes every selling price against `tax_rate`. Runs on the given
/// connection so a tax activation can reprice inside its own transaction.
pub(crate) async fn reprice_catalog<C: ConnectionTrait>(
    db: &C,
    tax_rate: Decimal,
) -> Result<u64, ServiceError> {
    let products = ProductEntity::find()
        .all(db)
        .await
        .map_err(ServiceError::from_db)?;

    let mut repriced = 0u64;
    for product in products {
        let new_price = pricing::selling_price(product.base_price, tax_rate);
        if new_price == product.selling_price {
            continue;
        }
        let mut active: ProductActiveModel = product.into();
        active.selling_price = Set(new_price);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(ServiceError::from_db)?;
        repriced += 1;
    }

    info!(repriced, "Catalog repriced");
    Ok(repriced)
}

/// Rate of the single active tax, or zero when none is configured yet.
pub(crate) async fn active_tax_rate<C: ConnectionTrait>(db: &C) -> Result<Decimal, ServiceError> {
    let tax = TaxEntity::find()
        .filter(tax::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(ServiceError::from_db)?;

    Ok(tax.map(|t| t.rate).unwrap_or(Decimal::ZERO))
}

fn model_to_response(model: ProductModel) -> ProductResponse {
    ProductResponse {
        id: model.id,
        sku: model.sku,
        name: model.name,
        unit: model.unit,
        base_price: model.base_price,
        selling_price: model.selling_price,
        stock_quantity: model.stock_quantity,
        description: model.description,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_request_requires_sku_and_unit() {
        let request = CreateProductRequest {
            sku: "".to_string(),
            name: "Minyak Goreng 1L".to_string(),
            unit: "pcs".to_string(),
            base_price: dec!(14_000),
            stock_quantity: None,
            description: None,
        };
        assert!(request.validate().is_err());

        let request = CreateProductRequest {
            sku: "MG-001".to_string(),
            name: "Minyak Goreng 1L".to_string(),
            unit: "".to_string(),
            base_price: dec!(14_000),
            stock_quantity: None,
            description: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn model_to_response_keeps_prices() {
        let now = Utc::now();
        let model = ProductModel {
            id: Uuid::new_v4(),
            sku: "MG-001".to_string(),
            name: "Minyak Goreng 1L".to_string(),
            unit: "pcs".to_string(),
            base_price: dec!(14_000),
            selling_price: dec!(16_000),
            stock_quantity: 120,
            description: None,
            is_active: true,
            created_at: now,
            updated_at: None,
        };

        let response = model_to_response(model);
        assert_eq!(response.base_price, dec!(14_000));
        assert_eq!(response.selling_price, dec!(16_000));
        assert_eq!(response.stock_quantity, 120);
    }
}
