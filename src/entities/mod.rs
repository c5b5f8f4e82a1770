pub mod cart;
pub mod cart_item;
pub mod delivery;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod sales_order;
pub mod sales_order_item;
pub mod sequence_counter;
pub mod stock_movement;
pub mod supplier;

pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use delivery::Entity as Delivery;
pub use product::Entity as Product;
pub use purchase_order::Entity as PurchaseOrder;
pub use purchase_order_item::Entity as PurchaseOrderItem;
pub use sales_order::Entity as SalesOrder;
pub use sales_order_item::Entity as SalesOrderItem;
pub use sequence_counter::Entity as SequenceCounter;
pub use stock_movement::Entity as StockMovement;
pub use supplier::Entity as Supplier;
