use crate::{
    entities::{
        cart, cart_item, sales_order, sales_order_item, Cart, CartItem, Product, SalesOrder,
        SalesOrderItem,
    },
    errors::{is_unique_violation, ServiceError},
    events::{Event, EventSender},
    services::{
        sequences::{sales_order_number, tracking_number, SALES_ORDER_SCOPE},
        SequenceService, StockService,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// How many times a failed order-number allocation is retried before the
/// request gives up with a conflict.
const NUMBER_ALLOCATION_RETRIES: u32 = 3;

/// Sales order service covering both order creation paths:
/// cart checkout (stock already reserved by the cart) and direct creation
/// (stock reserved here, atomically per line).
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    stock: StockService,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutInput {
    #[validate(length(min = 1))]
    pub shipping_address: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderInput {
    pub customer_id: i64,
    #[validate(length(min = 1))]
    #[validate]
    pub items: Vec<OrderItemInput>,
    #[validate(length(min = 1))]
    pub shipping_address: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItemInput {
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusInput {
    /// Target status; the transition must be allowed by the order state
    /// machine.
    #[validate(length(min = 1))]
    pub status: String,
}

/// Order header joined with its line items.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: sales_order::Model,
    pub items: Vec<sales_order_item::Model>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        stock: StockService,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            stock,
            event_sender,
        }
    }

    /// Converts the customer's cart into an order.
    ///
    /// The cart already holds the stock reservation, so no stock is touched
    /// here: the order takes ownership of the reserved units and the cart is
    /// emptied without restoring anything. Order number, item snapshots,
    /// cart clearing and the counter bump all commit atomically.
    #[instrument(skip(self))]
    pub async fn checkout(
        &self,
        customer_id: i64,
        input: CheckoutInput,
    ) -> Result<OrderView, ServiceError> {
        for attempt in 0..NUMBER_ALLOCATION_RETRIES {
            match self.try_checkout(customer_id, &input).await {
                Err(ServiceError::DatabaseError(e))
                    if is_unique_violation(&e) && attempt + 1 < NUMBER_ALLOCATION_RETRIES =>
                {
                    warn!(customer_id, attempt, "order number collision, retrying");
                    continue;
                }
                other => return other,
            }
        }
        Err(ServiceError::Conflict(
            "could not allocate a unique order number".to_string(),
        ))
    }

    async fn try_checkout(
        &self,
        customer_id: i64,
        input: &CheckoutInput,
    ) -> Result<OrderView, ServiceError> {
        let txn = self.db.begin().await?;

        // A customer without a cart row simply has an empty cart.
        let cart = Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::ValidationError("Cart is empty".to_string()))?;

        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .all(&txn)
            .await?;

        if lines.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }

        let now = Utc::now();
        let seq =
            SequenceService::next(&txn, SALES_ORDER_SCOPE, &SequenceService::sales_period(now))
                .await?;
        let order_number = sales_order_number(seq, now);

        let mut total = Decimal::ZERO;
        let mut snapshots = Vec::with_capacity(lines.len());
        for (item, product) in &lines {
            let product = product.as_ref().ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "cart item {} references missing product {}",
                    item.id, item.product_id
                ))
            })?;
            let line_total = product.price * Decimal::from(item.quantity);
            total += line_total;
            snapshots.push((product.clone(), item.quantity, line_total));
        }

        // Checkout is the fast-path sale: the order is already paid for and
        // fulfilled from the reservation, so it lands completed.
        let order = sales_order::ActiveModel {
            order_number: Set(order_number.clone()),
            customer_id: Set(customer_id),
            status: Set(sales_order::OrderStatus::Completed),
            total_amount: Set(total),
            shipping_address: Set(input.shipping_address.clone()),
            notes: Set(input.notes.clone()),
            tracking_number: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // The tracking number needs the generated id, so it lands in a
        // second write within the same transaction.
        let order_id = order.id;
        let mut with_tracking: sales_order::ActiveModel = order.into();
        with_tracking.tracking_number = Set(Some(tracking_number(order_id)));
        let order = with_tracking.update(&txn).await?;

        let mut items = Vec::with_capacity(snapshots.len());
        for (product, quantity, line_total) in snapshots {
            let item = sales_order_item::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(product.id),
                product_name: Set(product.name),
                quantity: Set(quantity),
                unit_price: Set(product.price),
                total_price: Set(line_total),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        // The reservation moved into the order; clearing must not restock.
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
            })
            .await;

        info!(order_id = order.id, order_number = %order.order_number, "checked out cart");
        Ok(OrderView { order, items })
    }

    /// Creates an order directly from a line list, bypassing the cart.
    ///
    /// Each line decrements stock atomically; any shortfall fails the whole
    /// order and rolls every decrement back.
    #[instrument(skip(self))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderView, ServiceError> {
        for attempt in 0..NUMBER_ALLOCATION_RETRIES {
            match self.try_create_order(&input).await {
                Err(ServiceError::DatabaseError(e))
                    if is_unique_violation(&e) && attempt + 1 < NUMBER_ALLOCATION_RETRIES =>
                {
                    warn!(attempt, "order number collision, retrying");
                    continue;
                }
                other => return other,
            }
        }
        Err(ServiceError::Conflict(
            "could not allocate a unique order number".to_string(),
        ))
    }

    async fn try_create_order(&self, input: &CreateOrderInput) -> Result<OrderView, ServiceError> {
        let txn = self.db.begin().await?;

        let now = Utc::now();
        let seq =
            SequenceService::next(&txn, SALES_ORDER_SCOPE, &SequenceService::sales_period(now))
                .await?;
        let order_number = sales_order_number(seq, now);

        let mut total = Decimal::ZERO;
        let mut snapshots = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = Product::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;

            self.stock
                .adjust_in_txn(
                    &txn,
                    line.product_id,
                    -line.quantity,
                    "order_create",
                    Some(order_number.clone()),
                )
                .await?;

            let line_total = product.price * Decimal::from(line.quantity);
            total += line_total;
            snapshots.push((product, line.quantity, line_total));
        }

        let order = sales_order::ActiveModel {
            order_number: Set(order_number.clone()),
            customer_id: Set(input.customer_id),
            status: Set(sales_order::OrderStatus::Pending),
            total_amount: Set(total),
            shipping_address: Set(input.shipping_address.clone()),
            notes: Set(input.notes.clone()),
            tracking_number: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let order_id = order.id;
        let mut with_tracking: sales_order::ActiveModel = order.into();
        with_tracking.tracking_number = Set(Some(tracking_number(order_id)));
        let order = with_tracking.update(&txn).await?;

        let mut items = Vec::with_capacity(snapshots.len());
        for (product, quantity, line_total) in snapshots {
            let item = sales_order_item::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(product.id),
                product_name: Set(product.name),
                quantity: Set(quantity),
                unit_price: Set(product.price),
                total_price: Set(line_total),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
            })
            .await;

        info!(order_id = order.id, order_number = %order.order_number, "created order");
        Ok(OrderView { order, items })
    }

    /// Returns one order with its line items.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i64) -> Result<OrderView, ServiceError> {
        let order = SalesOrder::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = SalesOrderItem::find()
            .filter(sales_order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok(OrderView { order, items })
    }

    /// Lists orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<sales_order::Model>, ServiceError> {
        let orders = SalesOrder::find()
            .order_by_desc(sales_order::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(orders)
    }

    /// Moves an order through its status state machine.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: i64,
        new_status: sales_order::OrderStatus,
    ) -> Result<sales_order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let order = SalesOrder::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !order.status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move order from {} to {}",
                order.status.as_str(),
                new_status.as_str()
            )));
        }

        let old_status = order.status;
        let mut active: sales_order::ActiveModel = order.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: new_status.as_str().to_string(),
            })
            .await;

        Ok(updated)
    }
}
