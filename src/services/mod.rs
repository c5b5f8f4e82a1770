pub mod carts;
pub mod deliveries;
pub mod orders;
pub mod products;
pub mod purchase_orders;
pub mod sequences;
pub mod stock;
pub mod suppliers;

pub use carts::CartService;
pub use deliveries::DeliveryService;
pub use orders::OrderService;
pub use products::ProductService;
pub use purchase_orders::PurchaseOrderService;
pub use sequences::SequenceService;
pub use stock::StockService;
pub use suppliers::SupplierService;
