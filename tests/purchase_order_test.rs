mod common;

use common::TestServices;
use pneushop_api::{
    entities::{delivery::DeliveryStatus, purchase_order::PurchaseOrderStatus},
    errors::ServiceError,
    services::purchase_orders::{CreatePurchaseOrderInput, PurchaseItemInput},
};
use rust_decimal::Decimal;

fn draft_input(supplier_id: i64, product_id: i64, quantity: i32) -> CreatePurchaseOrderInput {
    CreatePurchaseOrderInput {
        supplier_id,
        invoice_number: None,
        note: None,
        week: Some("35".to_string()),
        year: Some("2026".to_string()),
        global_discount: Decimal::ZERO,
        confirmed: false,
        items: vec![PurchaseItemInput {
            product_id,
            quantity,
            unit_price_ht: Decimal::new(45_500, 3),
            discount: Decimal::ZERO,
        }],
    }
}

#[tokio::test]
async fn draft_order_does_not_touch_stock() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Michelin").await;
    let product = app.seed_product("205-55-16", 5).await;

    let po = app
        .services
        .purchase_orders
        .create(draft_input(supplier.id, product.id, 10))
        .await
        .expect("create draft");

    assert_eq!(po.order.status, PurchaseOrderStatus::Draft);
    assert!(po.order.order_number.starts_with("ACH-"));
    assert_eq!(po.items[0].received_quantity, 0);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 5);

    // Line snapshots come from the product row.
    assert_eq!(po.items[0].reference, "205-55-16");
    assert_eq!(po.items[0].designation, "Tire 205-55-16");

    // No delivery until the order is confirmed.
    assert!(app
        .services
        .deliveries
        .list_deliveries()
        .await
        .unwrap()
        .is_empty());

    // The supplier's counter was bumped.
    let supplier = app.services.suppliers.get(supplier.id).await.unwrap();
    assert_eq!(supplier.orders_count, 1);
}

#[tokio::test]
async fn totals_are_recomputed_with_line_and_global_discounts() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Continental").await;
    let product = app.seed_product("225-45-17", 0).await;

    let po = app
        .services
        .purchase_orders
        .create(CreatePurchaseOrderInput {
            supplier_id: supplier.id,
            invoice_number: Some("INV-2026-118".to_string()),
            note: None,
            week: None,
            year: None,
            global_discount: Decimal::new(10, 0),
            confirmed: false,
            items: vec![PurchaseItemInput {
                product_id: product.id,
                quantity: 4,
                unit_price_ht: Decimal::new(50, 0),
                discount: Decimal::new(5, 0),
            }],
        })
        .await
        .expect("create");

    // 4 * 50 = 200, minus 5% line discount = 190, minus 10% global = 171.
    assert_eq!(po.items[0].total_ht, Decimal::new(190, 0));
    assert_eq!(po.order.subtotal, Decimal::new(190, 0));
    assert_eq!(po.order.total, Decimal::new(171, 0));
}

#[tokio::test]
async fn confirm_derives_exactly_one_delivery() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Michelin").await;
    let product = app.seed_product("205-55-16", 0).await;

    let po = app
        .services
        .purchase_orders
        .create(draft_input(supplier.id, product.id, 8))
        .await
        .expect("create draft");

    let po = app
        .services
        .purchase_orders
        .confirm(po.order.id)
        .await
        .expect("confirm");
    assert_eq!(po.order.status, PurchaseOrderStatus::Confirmed);
    assert!(po.order.confirmed_date.is_some());

    // Confirming only announces the goods; stock moves at receipt.
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 0);

    let deliveries = app.services.deliveries.list_deliveries().await.unwrap();
    assert_eq!(deliveries.len(), 1);
    let delivery = &deliveries[0];
    assert_eq!(delivery.purchase_order_id, po.order.id);
    assert_eq!(delivery.client, format!("Michelin (PO-{})", po.order.id));
    assert_eq!(delivery.address, "Entrepôt principal");
    assert_eq!(delivery.carrier, "À assigner");
    assert_eq!(delivery.status, DeliveryStatus::Preparing);
    assert_eq!(delivery.parcel_count, 8);

    // Confirming twice is rejected, so no second delivery can appear.
    let err = app
        .services
        .purchase_orders
        .confirm(po.order.id)
        .await
        .expect_err("already confirmed");
    assert!(matches!(err, ServiceError::InvalidStatus(_)), "{err:?}");
    assert_eq!(app.services.deliveries.list_deliveries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn receive_applies_stock_exactly_once() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Michelin").await;
    let product = app.seed_product("195-65-15", 2).await;

    let po = app
        .services
        .purchase_orders
        .create(draft_input(supplier.id, product.id, 6))
        .await
        .expect("create draft");
    app.services
        .purchase_orders
        .confirm(po.order.id)
        .await
        .expect("confirm");

    let po = app
        .services
        .purchase_orders
        .mark_received(po.order.id)
        .await
        .expect("receive");
    assert_eq!(po.order.status, PurchaseOrderStatus::Received);
    assert!(po.order.received_date.is_some());
    assert_eq!(po.items[0].received_quantity, 6);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 8);

    // A second receive is rejected and stock stays put.
    let err = app
        .services
        .purchase_orders
        .mark_received(po.order.id)
        .await
        .expect_err("already received");
    assert!(matches!(err, ServiceError::InvalidStatus(_)), "{err:?}");
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 8);
}

#[tokio::test]
async fn confirmed_at_creation_applies_stock_and_derives_delivery() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Pirelli").await;
    let product = app.seed_product("245-40-18", 1).await;

    let mut input = draft_input(supplier.id, product.id, 12);
    input.confirmed = true;

    let po = app
        .services
        .purchase_orders
        .create(input)
        .await
        .expect("create confirmed");

    assert_eq!(po.order.status, PurchaseOrderStatus::Confirmed);
    assert_eq!(po.items[0].received_quantity, 12);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 13);
    assert_eq!(app.services.deliveries.list_deliveries().await.unwrap().len(), 1);

    // Lines were already received at creation, so receiving adds nothing.
    let po = app
        .services
        .purchase_orders
        .mark_received(po.order.id)
        .await
        .expect("receive");
    assert_eq!(po.order.status, PurchaseOrderStatus::Received);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 13);
}

#[tokio::test]
async fn cancel_takes_back_stock_applied_at_creation() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Goodyear").await;
    let product = app.seed_product("215-60-16", 0).await;

    let mut input = draft_input(supplier.id, product.id, 5);
    input.confirmed = true;

    let po = app
        .services
        .purchase_orders
        .create(input)
        .await
        .expect("create confirmed");
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 5);

    let po = app
        .services
        .purchase_orders
        .cancel(po.order.id)
        .await
        .expect("cancel");
    assert_eq!(po.order.status, PurchaseOrderStatus::Cancelled);
    assert_eq!(po.items[0].received_quantity, 0);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 0);
}

#[tokio::test]
async fn cancel_fails_when_received_units_were_already_sold() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Goodyear").await;
    let product = app.seed_product("215-60-16", 0).await;

    let mut input = draft_input(supplier.id, product.id, 5);
    input.confirmed = true;

    let po = app
        .services
        .purchase_orders
        .create(input)
        .await
        .expect("create confirmed");

    // Sell three of the received units out from under the order.
    app.services
        .stock
        .adjust(product.id, -3, "manual", None)
        .await
        .expect("sell");

    let err = app
        .services
        .purchase_orders
        .cancel(po.order.id)
        .await
        .expect_err("units gone");
    assert!(matches!(err, ServiceError::InsufficientStock(_)), "{err:?}");

    // The failed cancellation must not have touched anything.
    let po = app.services.purchase_orders.get(po.order.id).await.unwrap();
    assert_eq!(po.order.status, PurchaseOrderStatus::Confirmed);
    assert_eq!(po.items[0].received_quantity, 5);
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 2);
}

#[tokio::test]
async fn received_orders_cannot_be_cancelled() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Michelin").await;
    let product = app.seed_product("205-55-16", 0).await;

    let po = app
        .services
        .purchase_orders
        .create(draft_input(supplier.id, product.id, 2))
        .await
        .expect("create");
    app.services
        .purchase_orders
        .confirm(po.order.id)
        .await
        .expect("confirm");
    app.services
        .purchase_orders
        .mark_received(po.order.id)
        .await
        .expect("receive");

    let err = app
        .services
        .purchase_orders
        .cancel(po.order.id)
        .await
        .expect_err("received is final");
    assert!(matches!(err, ServiceError::InvalidStatus(_)), "{err:?}");
}

#[tokio::test]
async fn delivery_status_walks_prepare_en_route_livre() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Michelin").await;
    let product = app.seed_product("205-55-16", 0).await;

    let mut input = draft_input(supplier.id, product.id, 3);
    input.confirmed = true;
    let po = app
        .services
        .purchase_orders
        .create(input)
        .await
        .expect("create confirmed");

    let delivery = app
        .services
        .deliveries
        .list_deliveries()
        .await
        .unwrap()
        .into_iter()
        .find(|d| d.purchase_order_id == po.order.id)
        .expect("derived delivery");

    // Skipping en_route is not allowed.
    let err = app
        .services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Delivered)
        .await
        .expect_err("must go through en_route");
    assert!(matches!(err, ServiceError::InvalidStatus(_)), "{err:?}");

    let delivery = app
        .services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::EnRoute)
        .await
        .expect("en route");
    assert_eq!(delivery.status, DeliveryStatus::EnRoute);

    let delivery = app
        .services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Delivered)
        .await
        .expect("delivered");
    assert_eq!(delivery.status, DeliveryStatus::Delivered);
}

#[tokio::test]
async fn stats_count_orders_and_exclude_cancelled_totals() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Michelin").await;
    let product = app.seed_product("205-55-16", 0).await;

    // One draft of 2 * 45.5 = 91, one cancelled draft of the same amount.
    let kept = app
        .services
        .purchase_orders
        .create(draft_input(supplier.id, product.id, 2))
        .await
        .expect("draft");
    let doomed = app
        .services
        .purchase_orders
        .create(draft_input(supplier.id, product.id, 2))
        .await
        .expect("second draft");
    app.services
        .purchase_orders
        .cancel(doomed.order.id)
        .await
        .expect("cancel");

    let stats = app.services.purchase_orders.stats().await.expect("stats");
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.draft, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.confirmed, 0);
    assert_eq!(stats.received, 0);
    assert_eq!(stats.total_amount, kept.order.total);
}
