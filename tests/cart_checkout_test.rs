mod common;

use common::TestServices;
use pneushop_api::{
    entities::sales_order::OrderStatus,
    errors::ServiceError,
    services::carts::{AddItemInput, UpdateItemInput},
    services::orders::{CheckoutInput, CreateOrderInput, OrderItemInput},
};
use rust_decimal::Decimal;

const CUSTOMER: i64 = 42;

#[tokio::test]
async fn adding_to_cart_reserves_stock_immediately() {
    let app = TestServices::new().await;
    let product = app.seed_product("205-55-16", 10).await;

    let cart = app
        .services
        .carts
        .add_item(
            CUSTOMER,
            AddItemInput {
                product_id: product.id,
                quantity: 3,
            },
        )
        .await
        .expect("add item");

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 7);

    // Adding the same product merges the line and reserves the extra units.
    let cart = app
        .services
        .carts
        .add_item(
            CUSTOMER,
            AddItemInput {
                product_id: product.id,
                quantity: 2,
            },
        )
        .await
        .expect("add again");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 5);
}

#[tokio::test]
async fn adding_more_than_available_fails_and_reserves_nothing() {
    let app = TestServices::new().await;
    let product = app.seed_product("195-65-15", 2).await;

    let err = app
        .services
        .carts
        .add_item(
            CUSTOMER,
            AddItemInput {
                product_id: product.id,
                quantity: 5,
            },
        )
        .await
        .expect_err("not enough stock");
    assert!(matches!(err, ServiceError::InsufficientStock(_)), "{err:?}");
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 2);

    let cart = app.services.carts.get_cart(CUSTOMER).await.expect("cart");
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn updating_quantity_adjusts_the_reservation_by_the_difference() {
    let app = TestServices::new().await;
    let product = app.seed_product("225-45-17", 10).await;

    app.services
        .carts
        .add_item(
            CUSTOMER,
            AddItemInput {
                product_id: product.id,
                quantity: 4,
            },
        )
        .await
        .expect("add");

    // 4 -> 6 reserves two more units.
    let cart = app
        .services
        .carts
        .update_item(CUSTOMER, product.id, UpdateItemInput { quantity: 6 })
        .await
        .expect("grow");
    assert_eq!(cart.items[0].quantity, 6);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 4);

    // 6 -> 1 restores five.
    let cart = app
        .services
        .carts
        .update_item(CUSTOMER, product.id, UpdateItemInput { quantity: 1 })
        .await
        .expect("shrink");
    assert_eq!(cart.items[0].quantity, 1);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 9);

    // 1 -> 0 removes the line entirely.
    let cart = app
        .services
        .carts
        .update_item(CUSTOMER, product.id, UpdateItemInput { quantity: 0 })
        .await
        .expect("zero");
    assert!(cart.items.is_empty());
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 10);
}

#[tokio::test]
async fn negative_quantity_removes_the_line_with_restock() {
    let app = TestServices::new().await;
    let product = app.seed_product("225-45-17", 10).await;

    app.services
        .carts
        .add_item(
            CUSTOMER,
            AddItemInput {
                product_id: product.id,
                quantity: 4,
            },
        )
        .await
        .expect("add");

    let cart = app
        .services
        .carts
        .update_item(CUSTOMER, product.id, UpdateItemInput { quantity: -1 })
        .await
        .expect("negative update");

    // No negative line may survive, and only the reserved four come back.
    assert!(cart.items.is_empty());
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 10);
}

#[tokio::test]
async fn removing_an_item_can_skip_the_restock() {
    let app = TestServices::new().await;
    let product = app.seed_product("185-60-14", 8).await;

    app.services
        .carts
        .add_item(
            CUSTOMER,
            AddItemInput {
                product_id: product.id,
                quantity: 3,
            },
        )
        .await
        .expect("add");

    app.services
        .carts
        .remove_item(CUSTOMER, product.id, false)
        .await
        .expect("remove without restock");

    // The units stay reserved (sold outside the cart flow).
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 5);
}

#[tokio::test]
async fn clearing_a_cart_restores_every_reservation() {
    let app = TestServices::new().await;
    let a = app.seed_product("205-55-16", 10).await;
    let b = app.seed_product("225-45-17", 6).await;

    for (product_id, quantity) in [(a.id, 4), (b.id, 2)] {
        app.services
            .carts
            .add_item(
                CUSTOMER,
                AddItemInput {
                    product_id,
                    quantity,
                },
            )
            .await
            .expect("add");
    }

    app.services.carts.clear(CUSTOMER, true).await.expect("clear");

    assert_eq!(app.services.stock.get_stock(a.id).await.unwrap(), 10);
    assert_eq!(app.services.stock.get_stock(b.id).await.unwrap(), 6);
    assert!(app
        .services
        .carts
        .get_cart(CUSTOMER)
        .await
        .unwrap()
        .items
        .is_empty());
}

#[tokio::test]
async fn checkout_converts_reservation_without_touching_stock_again() {
    let app = TestServices::new().await;
    let product = app.seed_product("205-55-16", 10).await;

    app.services
        .carts
        .add_item(
            CUSTOMER,
            AddItemInput {
                product_id: product.id,
                quantity: 4,
            },
        )
        .await
        .expect("add");

    let order = app
        .services
        .orders
        .checkout(
            CUSTOMER,
            CheckoutInput {
                shipping_address: "12 rue des Pneus, Lyon".to_string(),
                notes: None,
            },
        )
        .await
        .expect("checkout");

    // The cart already held the reservation.
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 6);
    // Checkout is the fast-path sale and lands directly in completed.
    assert_eq!(order.order.status, OrderStatus::Completed);
    assert!(order.order.order_number.starts_with("PS"));
    assert_eq!(
        order.order.tracking_number.as_deref(),
        Some(format!("TRK-{:06}", order.order.id).as_str())
    );
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 4);
    assert_eq!(
        order.order.total_amount,
        Decimal::new(89_990, 3) * Decimal::from(4)
    );

    // Cart emptied without a restock.
    assert!(app
        .services
        .carts
        .get_cart(CUSTOMER)
        .await
        .unwrap()
        .items
        .is_empty());
}

#[tokio::test]
async fn checkout_of_an_empty_cart_is_rejected() {
    let app = TestServices::new().await;
    app.seed_product("205-55-16", 10).await;

    let err = app
        .services
        .orders
        .checkout(
            CUSTOMER,
            CheckoutInput {
                shipping_address: "12 rue des Pneus, Lyon".to_string(),
                notes: None,
            },
        )
        .await
        .expect_err("empty cart");
    assert!(matches!(err, ServiceError::ValidationError(_)), "{err:?}");
}

#[tokio::test]
async fn direct_order_reserves_stock_atomically() {
    let app = TestServices::new().await;
    let product = app.seed_product("215-65-16", 5).await;

    let order = app
        .services
        .orders
        .create_order(CreateOrderInput {
            customer_id: 7,
            items: vec![OrderItemInput {
                product_id: product.id,
                quantity: 5,
            }],
            shipping_address: "3 avenue de la Gomme, Nantes".to_string(),
            notes: Some("appeler avant livraison".to_string()),
        })
        .await
        .expect("create order");

    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 0);
    assert_eq!(order.items[0].quantity, 5);

    // The shelf is now empty, the next order must fail outright.
    let err = app
        .services
        .orders
        .create_order(CreateOrderInput {
            customer_id: 8,
            items: vec![OrderItemInput {
                product_id: product.id,
                quantity: 1,
            }],
            shipping_address: "3 avenue de la Gomme, Nantes".to_string(),
            notes: None,
        })
        .await
        .expect_err("sold out");
    assert!(matches!(err, ServiceError::InsufficientStock(_)), "{err:?}");
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 0);
}

#[tokio::test]
async fn order_status_follows_the_state_machine() {
    let app = TestServices::new().await;
    let product = app.seed_product("205-55-16", 10).await;

    let order = app
        .services
        .orders
        .create_order(CreateOrderInput {
            customer_id: 9,
            items: vec![OrderItemInput {
                product_id: product.id,
                quantity: 1,
            }],
            shipping_address: "1 place Bellecour, Lyon".to_string(),
            notes: None,
        })
        .await
        .expect("create order");
    let order_id = order.order.id;

    // Pending cannot jump straight to shipped.
    let err = app
        .services
        .orders
        .update_status(order_id, OrderStatus::Shipped)
        .await
        .expect_err("invalid transition");
    assert!(matches!(err, ServiceError::InvalidStatus(_)), "{err:?}");

    for next in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        let updated = app
            .services
            .orders
            .update_status(order_id, next)
            .await
            .expect("transition");
        assert_eq!(updated.status, next);
    }

    // Delivered is terminal.
    let err = app
        .services
        .orders
        .update_status(order_id, OrderStatus::Cancelled)
        .await
        .expect_err("terminal state");
    assert!(matches!(err, ServiceError::InvalidStatus(_)), "{err:?}");
}
