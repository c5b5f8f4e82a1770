mod common;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use common::TestServices;
use pneushop_api::{config::AppConfig, events::EventSender, AppState};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "info".to_string(),
        log_json: false,
        auto_migrate: false,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 60,
        db_acquire_timeout_secs: 5,
        event_channel_capacity: 64,
        shutdown_timeout_secs: 1,
    }
}

async fn test_app() -> (axum::Router, TestServices) {
    let harness = TestServices::new().await;
    let (tx, mut rx) = mpsc::channel(64);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let state = AppState {
        db: harness.db.clone(),
        config: test_config(),
        event_sender: EventSender::new(tx),
        services: harness.services.clone(),
    };
    (pneushop_api::app(state), harness)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_database_state() {
    let (app, _harness) = test_app().await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"], "healthy");
}

#[tokio::test]
async fn product_crud_over_http() {
    let (app, _harness) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/products")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "reference": "205-55-16",
                        "name": "Tire 205-55-16",
                        "price": "89.990",
                        "stock": 10
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["stock"], 10);

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/v1/products/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Duplicate reference conflicts.
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/products")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "reference": "205-55-16",
                        "name": "Same again",
                        "price": "10.000"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(
            Request::get("/api/v1/products/999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stock_adjustment_rejects_overdraw_with_bad_request() {
    let (app, harness) = test_app().await;
    let product = harness.seed_product("195-65-15", 2).await;

    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/products/{}/stock", product.id))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "delta": -5, "reason": "manual" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::post(format!("/api/v1/products/{}/stock", product.id))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "delta": -2, "reason": "manual" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stock"], 0);
}

#[tokio::test]
async fn cart_checkout_over_http() {
    let (app, harness) = test_app().await;
    let product = harness.seed_product("225-45-17", 6).await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/carts/42/items")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "product_id": product.id, "quantity": 2 }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cart = body_json(response).await;
    assert_eq!(cart["items"][0]["quantity"], 2);

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/carts/42/checkout")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "shipping_address": "12 rue des Pneus, Lyon" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = body_json(response).await;
    assert!(order["order_number"].as_str().unwrap().starts_with("PS"));

    // Checking out left the cart empty.
    let response = app
        .oneshot(Request::get("/api/v1/carts/42").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cart = body_json(response).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}
