use std::sync::Arc;

use pneushop_api::{
    db::{self, DbConfig, DbPool},
    entities::{product, supplier},
    events::{self, EventSender},
    handlers::AppServices,
    services::products::CreateProductInput,
    services::suppliers::CreateSupplierInput,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

/// Test harness backed by an in-memory SQLite database.
///
/// The pool is pinned to a single connection because every pooled connection
/// to `sqlite::memory:` would otherwise get its own empty database.
pub struct TestServices {
    pub services: AppServices,
    pub db: Arc<DbPool>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestServices {
    pub async fn new() -> Self {
        let cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender));

        Self {
            services,
            db: db_arc,
            _event_task: event_task,
        }
    }

    pub async fn seed_product(&self, reference: &str, stock: i32) -> product::Model {
        self.services
            .products
            .create(CreateProductInput {
                reference: reference.to_string(),
                name: format!("Tire {}", reference),
                price: Decimal::new(89_990, 3),
                stock,
            })
            .await
            .expect("seed product")
    }

    pub async fn seed_supplier(&self, name: &str) -> supplier::Model {
        self.services
            .suppliers
            .create(CreateSupplierInput {
                name: name.to_string(),
            })
            .await
            .expect("seed supplier")
    }
}
