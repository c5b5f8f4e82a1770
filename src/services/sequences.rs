use crate::{
    entities::{sequence_counter, SequenceCounter},
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};

pub const SALES_ORDER_SCOPE: &str = "sales_order";
pub const PURCHASE_ORDER_SCOPE: &str = "purchase_order";

/// Allocates gap-free per-period sequence numbers from counter rows.
///
/// `next` runs inside the caller's transaction: the relative UPDATE takes a
/// row lock, so concurrent allocators for the same (scope, period) serialize
/// and each sees a distinct value. If the caller's transaction rolls back the
/// increment rolls back with it, keeping the sequence gap-free.
pub struct SequenceService;

impl SequenceService {
    /// Allocates the next value for (scope, period), starting at 1.
    ///
    /// The first allocation in a fresh period races on the counter row
    /// insert; the loser of that race gets a unique violation, which aborts
    /// the caller's transaction and is expected to be retried by the caller.
    pub async fn next<C: ConnectionTrait>(
        conn: &C,
        scope: &str,
        period: &str,
    ) -> Result<i64, ServiceError> {
        let result = SequenceCounter::update_many()
            .col_expr(
                sequence_counter::Column::Value,
                Expr::col(sequence_counter::Column::Value).add(1),
            )
            .filter(sequence_counter::Column::Scope.eq(scope))
            .filter(sequence_counter::Column::Period.eq(period))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            sequence_counter::ActiveModel {
                scope: Set(scope.to_string()),
                period: Set(period.to_string()),
                value: Set(1),
            }
            .insert(conn)
            .await?;
            return Ok(1);
        }

        let row = SequenceCounter::find_by_id((scope.to_string(), period.to_string()))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "sequence counter ({}, {}) vanished mid-transaction",
                    scope, period
                ))
            })?;

        Ok(row.value)
    }

    /// Yearly period key for sales order numbers ("25" for 2025).
    pub fn sales_period(now: DateTime<Utc>) -> String {
        format!("{:02}", now.year() % 100)
    }

    /// Monthly period key for purchase order numbers ("202507").
    pub fn purchase_period(now: DateTime<Utc>) -> String {
        format!("{}{:02}", now.year(), now.month())
    }
}

/// Sales order number: "PS" + two-digit year + zero-based counter, six
/// digits. The first order of a year is PS{yy}000000.
pub fn sales_order_number(seq: i64, now: DateTime<Utc>) -> String {
    format!("PS{:02}{:06}", now.year() % 100, seq - 1)
}

/// Purchase order number: "ACH-" + year + month + one-based counter, four
/// digits. The first order of a month is ACH-{yyyy}{mm}-0001.
pub fn purchase_order_number(seq: i64, now: DateTime<Utc>) -> String {
    format!("ACH-{}{:02}-{:04}", now.year(), now.month(), seq)
}

/// Tracking number derived from the numeric order id.
pub fn tracking_number(order_id: i64) -> String {
    format!("TRK-{:06}", order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_sales_order_of_the_year_is_zero_based() {
        assert_eq!(sales_order_number(1, at(2025, 3)), "PS25000000");
        assert_eq!(sales_order_number(100, at(2025, 3)), "PS25000099");
    }

    #[test]
    fn sales_number_rolls_with_the_year() {
        assert_eq!(sales_order_number(1, at(2026, 1)), "PS26000000");
    }

    #[test]
    fn purchase_number_is_one_based_and_monthly() {
        assert_eq!(purchase_order_number(1, at(2025, 7)), "ACH-202507-0001");
        assert_eq!(purchase_order_number(42, at(2025, 12)), "ACH-202512-0042");
    }

    #[test]
    fn tracking_number_pads_the_order_id() {
        assert_eq!(tracking_number(7), "TRK-000007");
        assert_eq!(tracking_number(1234567), "TRK-1234567");
    }

    #[test]
    fn period_keys() {
        assert_eq!(SequenceService::sales_period(at(2025, 7)), "25");
        assert_eq!(SequenceService::purchase_period(at(2025, 7)), "202507");
    }
}
