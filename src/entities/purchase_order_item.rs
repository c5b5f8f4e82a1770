use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Line item of a purchase order. `total_ht` is derived from unit price,
/// quantity and discount on every save; client-supplied totals are ignored.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = PurchaseOrderItem)]
#[sea_orm(table_name = "purchase_order_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub purchase_order_id: i64,
    pub product_id: i64,
    pub reference: String,
    pub designation: String,
    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub unit_price_ht: Decimal,
    pub quantity: i32,
    /// Percentage discount on this line.
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub discount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub total_ht: Decimal,
    pub received_quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// HT line total: unit price x quantity, minus the line discount percent.
pub fn line_total(unit_price_ht: Decimal, quantity: i32, discount: Decimal) -> Decimal {
    let base = unit_price_ht * Decimal::from(quantity);
    base - (base * discount / Decimal::from(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_total_without_discount() {
        assert_eq!(line_total(dec!(120.500), 3, Decimal::ZERO), dec!(361.500));
    }

    #[test]
    fn line_total_applies_percentage_discount() {
        // 100 x 4 = 400, minus 25% = 300
        assert_eq!(line_total(dec!(100), 4, dec!(25)), dec!(300));
    }

    #[test]
    fn line_total_full_discount_is_zero() {
        assert_eq!(line_total(dec!(59.990), 2, dec!(100)), Decimal::ZERO);
    }

    proptest::proptest! {
        #[test]
        fn line_total_never_exceeds_the_undiscounted_base(
            cents in 0i64..10_000_000,
            quantity in 1i32..1_000,
            discount_pct in 0u32..=100,
        ) {
            let unit_price = Decimal::new(cents, 3);
            let discount = Decimal::from(discount_pct);
            let total = line_total(unit_price, quantity, discount);
            let base = unit_price * Decimal::from(quantity);

            proptest::prop_assert!(total >= Decimal::ZERO);
            proptest::prop_assert!(total <= base);
        }
    }
}
