pub mod carts;
pub mod common;
pub mod deliveries;
pub mod orders;
pub mod products;
pub mod purchase_orders;
pub mod suppliers;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: crate::services::ProductService,
    pub stock: crate::services::StockService,
    pub carts: crate::services::CartService,
    pub orders: crate::services::OrderService,
    pub purchase_orders: crate::services::PurchaseOrderService,
    pub deliveries: crate::services::DeliveryService,
    pub suppliers: crate::services::SupplierService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let products = crate::services::ProductService::new(db_pool.clone());
        let stock = crate::services::StockService::new(db_pool.clone(), event_sender.clone());
        let carts = crate::services::CartService::new(
            db_pool.clone(),
            stock.clone(),
            event_sender.clone(),
        );
        let orders = crate::services::OrderService::new(
            db_pool.clone(),
            stock.clone(),
            event_sender.clone(),
        );
        let deliveries =
            crate::services::DeliveryService::new(db_pool.clone(), event_sender.clone());
        let suppliers = crate::services::SupplierService::new(db_pool.clone());
        let purchase_orders = crate::services::PurchaseOrderService::new(
            db_pool,
            stock.clone(),
            deliveries.clone(),
            event_sender,
        );

        Self {
            products,
            stock,
            carts,
            orders,
            purchase_orders,
            deliveries,
            suppliers,
        }
    }
}
