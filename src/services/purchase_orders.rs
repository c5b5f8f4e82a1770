use crate::{
    entities::{
        purchase_order, purchase_order_item, supplier, PurchaseOrder, PurchaseOrderItem, Supplier,
    },
    errors::{is_unique_violation, ServiceError},
    events::{Event, EventSender},
    services::{
        sequences::{purchase_order_number, PURCHASE_ORDER_SCOPE},
        DeliveryService, SequenceService, StockService,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

const NUMBER_ALLOCATION_RETRIES: u32 = 3;

/// Purchase order service: the inbound side of stock reconciliation.
///
/// A purchase order lives through draft -> confirmed -> received.
/// Receiving is what increases product stock; orders created directly in
/// confirmed state take the shortcut of receiving their lines immediately,
/// and confirmation is also the moment the inbound delivery is derived.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DatabaseConnection>,
    stock: StockService,
    deliveries: DeliveryService,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: i64,
    pub invoice_number: Option<String>,
    pub note: Option<String>,
    pub week: Option<String>,
    pub year: Option<String>,
    /// Percentage discount applied on top of the summed line totals.
    #[serde(default)]
    pub global_discount: Decimal,
    /// When true the order is created already confirmed: stock goes up
    /// immediately, lines count as received, and the delivery is derived.
    #[serde(default)]
    pub confirmed: bool,
    #[validate(length(min = 1))]
    #[validate]
    pub items: Vec<PurchaseItemInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseItemInput {
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price_ht: Decimal,
    /// Percentage discount on this line.
    #[serde(default)]
    pub discount: Decimal,
}

/// Purchase order header joined with its line items.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderView {
    #[serde(flatten)]
    pub order: purchase_order::Model,
    pub items: Vec<purchase_order_item::Model>,
}

/// Aggregate counters for the procurement dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderStats {
    pub total_orders: u64,
    pub draft: u64,
    pub confirmed: u64,
    pub received: u64,
    pub cancelled: u64,
    /// Sum of order totals, cancelled orders excluded.
    pub total_amount: Decimal,
}

#[derive(Debug, FromQueryResult)]
struct TotalRow {
    total: Option<Decimal>,
}

impl PurchaseOrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        stock: StockService,
        deliveries: DeliveryService,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            stock,
            deliveries,
            event_sender,
        }
    }

    /// Creates a purchase order, draft or directly confirmed.
    ///
    /// Line totals are always recomputed from unit price, quantity and
    /// discount; whatever total the client sends is ignored. The supplier's
    /// order counter is bumped in the same transaction.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreatePurchaseOrderInput,
    ) -> Result<PurchaseOrderView, ServiceError> {
        for attempt in 0..NUMBER_ALLOCATION_RETRIES {
            match self.try_create(&input).await {
                Err(ServiceError::DatabaseError(e))
                    if is_unique_violation(&e) && attempt + 1 < NUMBER_ALLOCATION_RETRIES =>
                {
                    warn!(attempt, "purchase order number collision, retrying");
                    continue;
                }
                other => return other,
            }
        }
        Err(ServiceError::Conflict(
            "could not allocate a unique purchase order number".to_string(),
        ))
    }

    async fn try_create(
        &self,
        input: &CreatePurchaseOrderInput,
    ) -> Result<PurchaseOrderView, ServiceError> {
        let txn = self.db.begin().await?;

        let supplier = Supplier::find_by_id(input.supplier_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Supplier {} not found", input.supplier_id))
            })?;

        let now = Utc::now();
        let seq = SequenceService::next(
            &txn,
            PURCHASE_ORDER_SCOPE,
            &SequenceService::purchase_period(now),
        )
        .await?;
        let order_number = purchase_order_number(seq, now);

        // Recompute money server-side.
        let mut subtotal = Decimal::ZERO;
        let mut lines = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = crate::entities::Product::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;
            let total_ht =
                purchase_order_item::line_total(line.unit_price_ht, line.quantity, line.discount);
            subtotal += total_ht;
            lines.push((product, line, total_ht));
        }
        let total = subtotal - (subtotal * input.global_discount / Decimal::from(100));

        let (status, confirmed_date) = if input.confirmed {
            (purchase_order::PurchaseOrderStatus::Confirmed, Some(now))
        } else {
            (purchase_order::PurchaseOrderStatus::Draft, None)
        };

        let order = purchase_order::ActiveModel {
            order_number: Set(order_number.clone()),
            supplier_id: Set(supplier.id),
            invoice_number: Set(input.invoice_number.clone()),
            note: Set(input.note.clone()),
            week: Set(input.week.clone()),
            year: Set(input.year.clone()),
            subtotal: Set(subtotal),
            global_discount: Set(input.global_discount),
            total: Set(total),
            status: Set(status),
            order_date: Set(now),
            confirmed_date: Set(confirmed_date),
            received_date: Set(None),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut parcel_count = 0;
        let mut items = Vec::with_capacity(lines.len());
        for (product, line, total_ht) in lines {
            // Confirmed-at-creation lines count as received right away.
            let received_quantity = if input.confirmed { line.quantity } else { 0 };
            let item = purchase_order_item::ActiveModel {
                purchase_order_id: Set(order.id),
                product_id: Set(product.id),
                reference: Set(product.reference.clone()),
                designation: Set(product.name.clone()),
                unit_price_ht: Set(line.unit_price_ht),
                quantity: Set(line.quantity),
                discount: Set(line.discount),
                total_ht: Set(total_ht),
                received_quantity: Set(received_quantity),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            if input.confirmed {
                self.stock
                    .adjust_in_txn(
                        &txn,
                        product.id,
                        line.quantity,
                        "purchase_receipt",
                        Some(order_number.clone()),
                    )
                    .await?;
            }

            parcel_count += item.quantity;
            items.push(item);
        }

        Supplier::update_many()
            .col_expr(
                supplier::Column::OrdersCount,
                Expr::col(supplier::Column::OrdersCount).add(1),
            )
            .filter(supplier::Column::Id.eq(supplier.id))
            .exec(&txn)
            .await?;

        let derived = if input.confirmed {
            self.deliveries
                .derive_in_txn(&txn, &order, &supplier.name, parcel_count)
                .await?
        } else {
            None
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderCreated {
                purchase_order_id: order.id,
                order_number: order.order_number.clone(),
            })
            .await;
        if let Some(delivery) = derived {
            self.event_sender
                .send_or_log(Event::DeliveryCreated {
                    delivery_id: delivery.id,
                    purchase_order_id: Some(order.id),
                })
                .await;
        }

        info!(purchase_order_id = order.id, order_number = %order.order_number, "created purchase order");
        Ok(PurchaseOrderView { order, items })
    }

    /// Confirms a draft order and derives its inbound delivery.
    /// Stock stays untouched until the goods are actually received.
    #[instrument(skip(self))]
    pub async fn confirm(&self, purchase_order_id: i64) -> Result<PurchaseOrderView, ServiceError> {
        let txn = self.db.begin().await?;

        let (order, items) = self.load_for_update(&txn, purchase_order_id).await?;

        if order.status != purchase_order::PurchaseOrderStatus::Draft {
            return Err(ServiceError::InvalidStatus(format!(
                "only draft orders can be confirmed, order {} is {}",
                purchase_order_id,
                order.status.as_str()
            )));
        }

        let supplier = Supplier::find_by_id(order.supplier_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Supplier {} not found", order.supplier_id))
            })?;

        let mut active: purchase_order::ActiveModel = order.into();
        active.status = Set(purchase_order::PurchaseOrderStatus::Confirmed);
        active.confirmed_date = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        let order = active.update(&txn).await?;

        let parcel_count = items.iter().map(|i| i.quantity).sum();
        let derived = self
            .deliveries
            .derive_in_txn(&txn, &order, &supplier.name, parcel_count)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderConfirmed { purchase_order_id })
            .await;
        if let Some(delivery) = derived {
            self.event_sender
                .send_or_log(Event::DeliveryCreated {
                    delivery_id: delivery.id,
                    purchase_order_id: Some(purchase_order_id),
                })
                .await;
        }

        Ok(PurchaseOrderView { order, items })
    }

    /// Receives a confirmed order: every line's outstanding quantity lands
    /// in product stock, exactly once even if the endpoint is retried.
    #[instrument(skip(self))]
    pub async fn mark_received(
        &self,
        purchase_order_id: i64,
    ) -> Result<PurchaseOrderView, ServiceError> {
        let txn = self.db.begin().await?;

        let (order, items) = self.load_for_update(&txn, purchase_order_id).await?;

        // Claim the confirmed -> received transition with a conditional
        // update; a concurrent receive loses the race on rows_affected
        // instead of applying the stock increments a second time.
        let now = Utc::now();
        let claimed = PurchaseOrder::update_many()
            .col_expr(
                purchase_order::Column::Status,
                Expr::value(purchase_order::PurchaseOrderStatus::Received),
            )
            .col_expr(purchase_order::Column::ReceivedDate, Expr::value(Some(now)))
            .col_expr(purchase_order::Column::UpdatedAt, Expr::value(now))
            .filter(purchase_order::Column::Id.eq(purchase_order_id))
            .filter(
                purchase_order::Column::Status
                    .eq(purchase_order::PurchaseOrderStatus::Confirmed),
            )
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 0 {
            return Err(ServiceError::InvalidStatus(format!(
                "only confirmed orders can be received, order {} is {}",
                purchase_order_id,
                order.status.as_str()
            )));
        }

        let mut updated_items = Vec::with_capacity(items.len());
        for item in items {
            // Outstanding = ordered minus already received; zero for lines
            // that were received at creation time.
            let outstanding = item.quantity - item.received_quantity;
            if outstanding > 0 {
                self.stock
                    .adjust_in_txn(
                        &txn,
                        item.product_id,
                        outstanding,
                        "purchase_receipt",
                        Some(order.order_number.clone()),
                    )
                    .await?;
            }
            let quantity = item.quantity;
            let mut active: purchase_order_item::ActiveModel = item.into();
            active.received_quantity = Set(quantity);
            updated_items.push(active.update(&txn).await?);
        }

        let order = PurchaseOrder::find_by_id(purchase_order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "purchase order {} vanished mid-receive",
                    purchase_order_id
                ))
            })?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderReceived { purchase_order_id })
            .await;

        info!(purchase_order_id, "received purchase order");
        Ok(PurchaseOrderView {
            order,
            items: updated_items,
        })
    }

    /// Cancels a draft or confirmed order. Stock that was already applied
    /// (confirmed-at-creation lines) is taken back; if those units were sold
    /// in the meantime the cancellation fails with `InsufficientStock`.
    #[instrument(skip(self))]
    pub async fn cancel(&self, purchase_order_id: i64) -> Result<PurchaseOrderView, ServiceError> {
        let txn = self.db.begin().await?;

        let (order, items) = self.load_for_update(&txn, purchase_order_id).await?;

        match order.status {
            purchase_order::PurchaseOrderStatus::Received => {
                return Err(ServiceError::InvalidStatus(format!(
                    "received order {} cannot be cancelled",
                    purchase_order_id
                )));
            }
            purchase_order::PurchaseOrderStatus::Cancelled => {
                return Err(ServiceError::InvalidStatus(format!(
                    "order {} is already cancelled",
                    purchase_order_id
                )));
            }
            _ => {}
        }

        let mut updated_items = Vec::with_capacity(items.len());
        for item in items {
            if item.received_quantity > 0 {
                self.stock
                    .adjust_in_txn(
                        &txn,
                        item.product_id,
                        -item.received_quantity,
                        "purchase_cancel",
                        Some(order.order_number.clone()),
                    )
                    .await?;
            }
            let mut active: purchase_order_item::ActiveModel = item.into();
            active.received_quantity = Set(0);
            updated_items.push(active.update(&txn).await?);
        }

        let mut active: purchase_order::ActiveModel = order.into();
        active.status = Set(purchase_order::PurchaseOrderStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        let order = active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderCancelled { purchase_order_id })
            .await;

        Ok(PurchaseOrderView {
            order,
            items: updated_items,
        })
    }

    /// Returns one purchase order with its lines.
    #[instrument(skip(self))]
    pub async fn get(&self, purchase_order_id: i64) -> Result<PurchaseOrderView, ServiceError> {
        let order = PurchaseOrder::find_by_id(purchase_order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", purchase_order_id))
            })?;

        let items = PurchaseOrderItem::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(purchase_order_id))
            .all(&*self.db)
            .await?;

        Ok(PurchaseOrderView { order, items })
    }

    /// Lists purchase orders, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<purchase_order::Model>, ServiceError> {
        let orders = PurchaseOrder::find()
            .order_by_desc(purchase_order::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(orders)
    }

    /// Aggregate counters for the procurement dashboard.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<PurchaseOrderStats, ServiceError> {
        use purchase_order::PurchaseOrderStatus::*;

        let db = &*self.db;
        let count_for = |status| {
            PurchaseOrder::find()
                .filter(purchase_order::Column::Status.eq(status))
                .count(db)
        };

        let draft = count_for(Draft).await?;
        let confirmed = count_for(Confirmed).await?;
        let received = count_for(Received).await?;
        let cancelled = count_for(Cancelled).await?;

        let total_row = PurchaseOrder::find()
            .select_only()
            .column_as(purchase_order::Column::Total.sum(), "total")
            .filter(purchase_order::Column::Status.ne(Cancelled))
            .into_model::<TotalRow>()
            .one(db)
            .await?;

        Ok(PurchaseOrderStats {
            total_orders: draft + confirmed + received + cancelled,
            draft,
            confirmed,
            received,
            cancelled,
            total_amount: total_row.and_then(|r| r.total).unwrap_or(Decimal::ZERO),
        })
    }

    async fn load_for_update(
        &self,
        txn: &DatabaseTransaction,
        purchase_order_id: i64,
    ) -> Result<(purchase_order::Model, Vec<purchase_order_item::Model>), ServiceError> {
        let order = PurchaseOrder::find_by_id(purchase_order_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", purchase_order_id))
            })?;

        let items = PurchaseOrderItem::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(purchase_order_id))
            .all(txn)
            .await?;

        Ok((order, items))
    }
}
