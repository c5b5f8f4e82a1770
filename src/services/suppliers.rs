use crate::{
    entities::{supplier, Supplier},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Supplier registry. Procurement only needs a name to order against and a
/// running count of orders placed; everything else about suppliers lives
/// elsewhere.
#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierInput {
    #[validate(length(min = 1))]
    pub name: String,
}

impl SupplierService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateSupplierInput) -> Result<supplier::Model, ServiceError> {
        let created = supplier::ActiveModel {
            name: Set(input.name),
            orders_count: Set(0),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(supplier_id = created.id, name = %created.name, "created supplier");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, supplier_id: i64) -> Result<supplier::Model, ServiceError> {
        Supplier::find_by_id(supplier_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", supplier_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        let suppliers = Supplier::find()
            .order_by_asc(supplier::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(suppliers)
    }
}
