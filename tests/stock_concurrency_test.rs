mod common;

use common::TestServices;
use pneushop_api::services::carts::AddItemInput;

// Ignored by default: with a single pooled SQLite connection the contention is
// serialized anyway, so this is mainly useful against Postgres.
// Run with: cargo test -- --ignored stock_reservation_concurrency
#[tokio::test]
#[ignore]
async fn stock_reservation_concurrency() {
    let app = TestServices::new().await;
    let product = app.seed_product("205-55-16", 10).await;

    // 20 customers race for 10 tires, one each. Exactly 10 may win.
    let mut tasks = Vec::new();
    for customer_id in 1..=20 {
        let carts = app.services.carts.clone();
        let product_id = product.id;
        tasks.push(tokio::spawn(async move {
            carts
                .add_item(
                    customer_id,
                    AddItemInput {
                        product_id,
                        quantity: 1,
                    },
                )
                .await
                .is_ok()
        }));
    }

    let mut success = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            success += 1;
        }
    }

    assert_eq!(success, 10, "exactly 10 reservations should succeed");
    assert_eq!(app.services.stock.get_stock(product.id).await.unwrap(), 0);
}
