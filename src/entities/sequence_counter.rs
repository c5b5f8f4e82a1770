use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Monotonic counter row, one per (scope, period). Allocation bumps `value`
/// with an UPDATE inside the caller's transaction; the row lock serializes
/// concurrent allocators.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sequence_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub scope: String,
    /// Period key, e.g. "25" for a yearly scope or "202507" for a monthly
    /// one. Rolling into a new period starts a fresh row at zero.
    #[sea_orm(primary_key, auto_increment = false)]
    pub period: String,
    pub value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
