use crate::{
    entities::{cart, cart_item, Cart, CartItem, Product},
    errors::{is_unique_violation, ServiceError},
    events::{Event, EventSender},
    services::StockService,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Cart service with an eager reservation policy: adding to a cart
/// decrements product stock immediately, so a carted item is a held item.
/// Removing or shrinking a line gives the stock back; checkout consumes the
/// reservation without touching stock again.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    stock: StockService,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddItemInput {
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItemInput {
    /// New absolute quantity; zero or below removes the line and restores
    /// its stock.
    pub quantity: i32,
}

/// Cart projection joined with product data.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub id: i64,
    pub customer_id: i64,
    pub items: Vec<CartItemView>,
    pub total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemView {
    pub product_id: i64,
    pub reference: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl CartService {
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

    /// Fetches the customer's cart, creating an empty one on first use.
    async fn get_or_create_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        customer_id: i64,
    ) -> Result<cart::Model, ServiceError> {
        if let Some(existing) = Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(conn)
            .await?
        {
            return Ok(existing);
        }

        let inserted = cart::ActiveModel {
            customer_id: Set(customer_id),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(conn)
        .await;

        match inserted {
            Ok(model) => Ok(model),
            // Lost the create race: another request inserted the cart first.
            Err(e) if is_unique_violation(&e) => {
                Cart::find()
                    .filter(cart::Column::CustomerId.eq(customer_id))
                    .one(conn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "cart for customer {} vanished after unique violation",
                            customer_id
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Adds a product to the cart, reserving stock as it goes.
    ///
    /// An existing line for the same product is merged by adding the
    /// quantities; the stock decrement covers only the added amount.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        customer_id: i64,
        input: AddItemInput,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = self.get_or_create_cart(&txn, customer_id).await?;

        // Reserve before touching the line; InsufficientStock aborts here
        // with the cart untouched.
        self.stock
            .adjust_in_txn(&txn, input.product_id, -input.quantity, "cart_add", None)
            .await?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&txn)
            .await?;

        match existing {
            Some(item) => {
                let merged = item.quantity + input.quantity;
                let mut item: cart_item::ActiveModel = item.into();
                item.quantity = Set(merged);
                item.updated_at = Set(Utc::now());
                item.update(&txn).await?;
            }
            None => {
                cart_item::ActiveModel {
                    cart_id: Set(cart.id),
                    product_id: Set(input.product_id),
                    quantity: Set(input.quantity),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        let view = self.build_view(&txn, &cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id: input.product_id,
                quantity: input.quantity,
            })
            .await;

        info!(cart_id = cart.id, product_id = input.product_id, "added item to cart");
        Ok(view)
    }

    /// Sets a line to an absolute quantity, settling the stock difference.
    ///
    /// Growing the line reserves more stock; shrinking it releases the
    /// difference; zero removes the line entirely.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        customer_id: i64,
        product_id: i64,
        input: UpdateItemInput,
    ) -> Result<CartView, ServiceError> {
        if input.quantity <= 0 {
            return self.remove_item(customer_id, product_id, true).await;
        }

        let txn = self.db.begin().await?;

        let cart = self.find_cart(&txn, customer_id).await?;
        let item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not in cart", product_id))
            })?;

        let delta = input.quantity - item.quantity;
        if delta != 0 {
            self.stock
                .adjust_in_txn(&txn, product_id, -delta, "cart_update", None)
                .await?;
        }

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(input.quantity);
        item.updated_at = Set(Utc::now());
        item.update(&txn).await?;

        let view = self.build_view(&txn, &cart).await?;
        txn.commit().await?;

        info!(cart_id = cart.id, product_id, quantity = input.quantity, "updated cart item");
        Ok(view)
    }

    /// Removes a line, restoring its reserved stock unless told otherwise.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        customer_id: i64,
        product_id: i64,
        restore_stock: bool,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = self.find_cart(&txn, customer_id).await?;
        let item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not in cart", product_id))
            })?;

        if restore_stock {
            self.stock
                .adjust_in_txn(&txn, product_id, item.quantity, "cart_remove", None)
                .await?;
        }

        item.delete(&txn).await?;

        let view = self.build_view(&txn, &cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                product_id,
            })
            .await;

        Ok(view)
    }

    /// Empties the cart. With `restore_stock` the reservations flow back to
    /// the products; without it they are simply dropped (the checkout path,
    /// where the order has taken ownership of the reserved units).
    #[instrument(skip(self))]
    pub async fn clear(
        &self,
        customer_id: i64,
        restore_stock: bool,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let cart = self.find_cart(&txn, customer_id).await?;

        self.clear_items_in_txn(&txn, cart.id, restore_stock).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartCleared {
                cart_id: cart.id,
                stock_restored: restore_stock,
            })
            .await;

        Ok(())
    }

    /// Deletes all lines of a cart inside the caller's transaction.
    pub(crate) async fn clear_items_in_txn<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: i64,
        restore_stock: bool,
    ) -> Result<(), ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(conn)
            .await?;

        for item in &items {
            if restore_stock {
                self.stock
                    .adjust_in_txn(conn, item.product_id, item.quantity, "cart_clear", None)
                    .await?;
            }
        }

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(conn)
            .await?;

        Ok(())
    }

    /// Returns the customer's cart with product details and totals. A
    /// customer who never carted anything gets a fresh empty cart.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, customer_id: i64) -> Result<CartView, ServiceError> {
        let cart = self.get_or_create_cart(&*self.db, customer_id).await?;
        self.build_view(&*self.db, &cart).await
    }

    async fn find_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        customer_id: i64,
    ) -> Result<cart::Model, ServiceError> {
        Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart for customer {} not found", customer_id))
            })
    }

    async fn build_view<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart: &cart::Model,
    ) -> Result<CartView, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .all(conn)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut total = Decimal::ZERO;
        for (item, product) in rows {
            let product = product.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "cart item {} references missing product {}",
                    item.id, item.product_id
                ))
            })?;
            let line_total = product.price * Decimal::from(item.quantity);
            total += line_total;
            items.push(CartItemView {
                product_id: product.id,
                reference: product.reference,
                name: product.name,
                quantity: item.quantity,
                unit_price: product.price,
                line_total,
            });
        }

        Ok(CartView {
            id: cart.id,
            customer_id: cart.customer_id,
            items,
            total,
        })
    }
}
