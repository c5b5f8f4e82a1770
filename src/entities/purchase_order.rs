use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Supplier-facing purchase order: the company buys FROM suppliers, so
/// receiving one INCREASES product stock (the mirror image of a sales
/// order). Status moves draft -> confirmed -> received; cancellation is
/// allowed from draft/confirmed only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = PurchaseOrder)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub order_number: String,
    pub supplier_id: i64,
    #[sea_orm(nullable)]
    pub invoice_number: Option<String>,
    #[sea_orm(nullable)]
    pub note: Option<String>,
    #[sea_orm(nullable)]
    pub week: Option<String>,
    #[sea_orm(nullable)]
    pub year: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub subtotal: Decimal,
    /// Percentage applied to the sum of item totals.
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub global_discount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub total: Decimal,
    pub status: PurchaseOrderStatus,
    pub order_date: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub confirmed_date: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub received_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Confirmed => "confirmed",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }
}
