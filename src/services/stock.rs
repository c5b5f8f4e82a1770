use crate::{
    entities::{product, stock_movement, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Stock service: the single write path for product stock counters.
///
/// Every mutation goes through a guarded relative UPDATE
/// (`stock = stock + delta` with a non-negativity predicate), so two
/// concurrent writers can never produce a lost update or a negative
/// counter. Each successful adjustment also appends a row to the
/// stock movement log inside the same transaction.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Applies a relative stock adjustment inside the caller's transaction.
    ///
    /// Returns the stock level after the adjustment. Fails with
    /// `InsufficientStock` when a negative delta would drive the counter
    /// below zero, and `NotFound` when the product does not exist; in both
    /// cases no row is touched.
    pub async fn adjust_in_txn<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: i64,
        delta: i32,
        reason: &str,
        reference: Option<String>,
    ) -> Result<i32, ServiceError> {
        if delta == 0 {
            let current = Product::find_by_id(product_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", product_id))
                })?;
            return Ok(current.stock);
        }

        let mut update = Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(delta),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id));

        // The guard predicate turns a decrement below zero into a no-op
        // instead of a constraint error.
        if delta < 0 {
            update = update.filter(product::Column::Stock.gte(-delta));
        }

        let result = update.exec(conn).await?;

        if result.rows_affected == 0 {
            let product = Product::find_by_id(product_id).one(conn).await?;
            return match product {
                Some(p) => Err(ServiceError::InsufficientStock(format!(
                    "product {}: available {}, requested {}",
                    p.reference, p.stock, -delta
                ))),
                None => Err(ServiceError::NotFound(format!(
                    "Product {} not found",
                    product_id
                ))),
            };
        }

        let updated = Product::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        stock_movement::ActiveModel {
            product_id: Set(product_id),
            delta: Set(delta),
            stock_after: Set(updated.stock),
            reason: Set(reason.to_string()),
            reference: Set(reference),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        Ok(updated.stock)
    }

    /// Standalone stock adjustment in its own transaction.
    #[instrument(skip(self))]
    pub async fn adjust(
        &self,
        product_id: i64,
        delta: i32,
        reason: &str,
        reference: Option<String>,
    ) -> Result<i32, ServiceError> {
        let txn = self.db.begin().await?;
        let new_stock = self
            .adjust_in_txn(&txn, product_id, delta, reason, reference)
            .await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::StockAdjusted {
                product_id,
                delta,
                new_stock,
                reason: reason.to_string(),
            })
            .await;

        info!(product_id, delta, new_stock, "adjusted stock");
        Ok(new_stock)
    }

    /// Returns the current stock level of a product.
    #[instrument(skip(self))]
    pub async fn get_stock(&self, product_id: i64) -> Result<i32, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        Ok(product.stock)
    }

    /// Returns the movement log for a product, newest first.
    #[instrument(skip(self))]
    pub async fn movements(
        &self,
        product_id: i64,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let movements = crate::entities::StockMovement::find()
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .order_by_desc(stock_movement::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(movements)
    }
}
