use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Customer-facing sales order. The header is immutable once created except
/// for status and tracking number; `order_number` is unique and assigned
/// exactly once.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = SalesOrder)]
#[sea_orm(table_name = "sales_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub order_number: String,
    pub customer_id: i64,
    pub status: OrderStatus,
    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub total_amount: Decimal,
    pub shipping_address: String,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    #[sea_orm(nullable)]
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_order_item::Entity")]
    Items,
}

impl Related<super::sales_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Checkout fast-path terminal state (no payment step).
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl OrderStatus {
    /// Transition table: pending -> processing -> shipped -> delivered,
    /// cancellation allowed until shipped, plus the pending -> completed
    /// checkout fast-path.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use test_case::test_case;

    #[test_case(Pending, Processing => true)]
    #[test_case(Pending, Completed => true)]
    #[test_case(Pending, Cancelled => true)]
    #[test_case(Processing, Shipped => true)]
    #[test_case(Shipped, Delivered => true)]
    #[test_case(Completed, Pending => false)]
    #[test_case(Delivered, Cancelled => false)]
    #[test_case(Shipped, Cancelled => false)]
    #[test_case(Cancelled, Pending => false)]
    fn transition_table(from: super::OrderStatus, to: super::OrderStatus) -> bool {
        from.can_transition_to(to)
    }
}
