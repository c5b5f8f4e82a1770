use crate::{
    entities::{product, Product},
    errors::{is_unique_violation, ServiceError},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Catalog service. Deliberately thin: pricing, media and search live in
/// other systems, this one only needs the reference data that stock and
/// orders hang off.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1))]
    pub reference: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub price: Decimal,
    /// Opening stock level.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock: i32,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Registers a product. The reference is the natural key; registering a
    /// duplicate reports a conflict rather than a bare database error.
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateProductInput) -> Result<product::Model, ServiceError> {
        let inserted = product::ActiveModel {
            reference: Set(input.reference.clone()),
            name: Set(input.name),
            price: Set(input.price),
            stock: Set(input.stock),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await;

        match inserted {
            Ok(model) => {
                info!(product_id = model.id, reference = %model.reference, "created product");
                Ok(model)
            }
            Err(e) if is_unique_violation(&e) => Err(ServiceError::Conflict(format!(
                "product reference {} already exists",
                input.reference
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns one product.
    #[instrument(skip(self))]
    pub async fn get(&self, product_id: i64) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Lists active products by reference.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<product::Model>, ServiceError> {
        let products = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_asc(product::Column::Reference)
            .all(&*self.db)
            .await?;
        Ok(products)
    }
}
