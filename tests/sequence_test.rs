mod common;

use chrono::{Datelike, Utc};
use common::TestServices;
use pneushop_api::services::orders::{CreateOrderInput, OrderItemInput};
use pneushop_api::services::sequences::{SequenceService, PURCHASE_ORDER_SCOPE, SALES_ORDER_SCOPE};

#[tokio::test]
async fn counters_start_at_one_and_are_isolated_per_scope_and_period() {
    let app = TestServices::new().await;
    let db = &*app.db;

    assert_eq!(
        SequenceService::next(db, SALES_ORDER_SCOPE, "26").await.unwrap(),
        1
    );
    assert_eq!(
        SequenceService::next(db, SALES_ORDER_SCOPE, "26").await.unwrap(),
        2
    );

    // Another period starts over.
    assert_eq!(
        SequenceService::next(db, SALES_ORDER_SCOPE, "27").await.unwrap(),
        1
    );

    // Another scope has its own counter.
    assert_eq!(
        SequenceService::next(db, PURCHASE_ORDER_SCOPE, "202608")
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        SequenceService::next(db, SALES_ORDER_SCOPE, "26").await.unwrap(),
        3
    );
}

#[tokio::test]
async fn order_numbers_are_sequential_within_the_year() {
    let app = TestServices::new().await;
    let product = app.seed_product("205-55-16", 10).await;

    let mut numbers = Vec::new();
    for customer_id in 1..=3 {
        let order = app
            .services
            .orders
            .create_order(CreateOrderInput {
                customer_id,
                items: vec![OrderItemInput {
                    product_id: product.id,
                    quantity: 1,
                }],
                shipping_address: "12 rue des Pneus, Lyon".to_string(),
                notes: None,
            })
            .await
            .expect("order");
        numbers.push(order.order.order_number);
    }

    let year = Utc::now().year() % 100;
    assert_eq!(numbers[0], format!("PS{:02}{:06}", year, 0));
    assert_eq!(numbers[1], format!("PS{:02}{:06}", year, 1));
    assert_eq!(numbers[2], format!("PS{:02}{:06}", year, 2));
}

#[tokio::test]
async fn purchase_order_numbers_carry_the_month_and_a_one_based_counter() {
    let app = TestServices::new().await;
    let supplier = app.seed_supplier("Michelin").await;
    let product = app.seed_product("205-55-16", 0).await;

    use pneushop_api::services::purchase_orders::{CreatePurchaseOrderInput, PurchaseItemInput};
    use rust_decimal::Decimal;

    let mut numbers = Vec::new();
    for _ in 0..2 {
        let po = app
            .services
            .purchase_orders
            .create(CreatePurchaseOrderInput {
                supplier_id: supplier.id,
                invoice_number: None,
                note: None,
                week: None,
                year: None,
                global_discount: Decimal::ZERO,
                confirmed: false,
                items: vec![PurchaseItemInput {
                    product_id: product.id,
                    quantity: 1,
                    unit_price_ht: Decimal::new(40, 0),
                    discount: Decimal::ZERO,
                }],
            })
            .await
            .expect("purchase order");
        numbers.push(po.order.order_number);
    }

    let now = Utc::now();
    let prefix = format!("ACH-{}{:02}-", now.year(), now.month());
    assert_eq!(numbers[0], format!("{}0001", prefix));
    assert_eq!(numbers[1], format!("{}0002", prefix));
}
