use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inbound delivery derived from a confirmed purchase order. One delivery per
/// purchase order, enforced by a unique index on `purchase_order_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deliveries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub purchase_order_id: i64,
    /// Display label "{supplier} (PO-{id})", kept for the legacy UI.
    pub client: String,
    pub address: String,
    pub carrier: String,
    pub status: DeliveryStatus,
    /// Total parcel count, the sum of line quantities at derivation time.
    pub parcel_count: i32,
    pub scheduled_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Legacy wire values are French and must stay stable for existing clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "prepare")]
    Preparing,
    #[sea_orm(string_value = "en_route")]
    EnRoute,
    #[sea_orm(string_value = "livre")]
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Preparing => "prepare",
            DeliveryStatus::EnRoute => "en_route",
            DeliveryStatus::Delivered => "livre",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prepare" => Ok(DeliveryStatus::Preparing),
            "en_route" => Ok(DeliveryStatus::EnRoute),
            "livre" => Ok(DeliveryStatus::Delivered),
            other => Err(format!("unknown delivery status: {}", other)),
        }
    }
}
