use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pneushop API",
        version = "0.2.0",
        description = "Tire-shop inventory backend: products and stock movements, \
            customer carts with stock reservation, sales orders, supplier purchase \
            orders and the deliveries derived from them."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    paths(
        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::adjust_stock,
        crate::handlers::products::list_movements,
        // Carts
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_item,
        crate::handlers::carts::update_item,
        crate::handlers::carts::remove_item,
        crate::handlers::carts::clear_cart,
        crate::handlers::carts::checkout,
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        // Purchase orders
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::purchase_order_stats,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::confirm_purchase_order,
        crate::handlers::purchase_orders::receive_purchase_order,
        crate::handlers::purchase_orders::cancel_purchase_order,
        // Deliveries
        crate::handlers::deliveries::list_deliveries,
        crate::handlers::deliveries::get_delivery,
        crate::handlers::deliveries::update_delivery_status,
        // Suppliers
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::services::products::CreateProductInput,
            crate::handlers::products::AdjustStockRequest,
            crate::services::carts::AddItemInput,
            crate::services::carts::UpdateItemInput,
            crate::services::carts::CartView,
            crate::services::carts::CartItemView,
            crate::services::orders::CheckoutInput,
            crate::services::orders::CreateOrderInput,
            crate::services::orders::OrderItemInput,
            crate::services::orders::UpdateOrderStatusInput,
            crate::services::orders::OrderView,
            crate::services::purchase_orders::CreatePurchaseOrderInput,
            crate::services::purchase_orders::PurchaseItemInput,
            crate::services::purchase_orders::PurchaseOrderView,
            crate::services::purchase_orders::PurchaseOrderStats,
            crate::handlers::deliveries::UpdateDeliveryStatusRequest,
            crate::services::suppliers::CreateSupplierInput,
        )
    ),
    tags(
        (name = "products", description = "Product catalog and stock adjustments"),
        (name = "carts", description = "Customer carts with immediate stock reservation"),
        (name = "orders", description = "Sales orders and status transitions"),
        (name = "purchase-orders", description = "Supplier purchase orders and receipt"),
        (name = "deliveries", description = "Inbound deliveries derived from purchase orders"),
        (name = "suppliers", description = "Supplier registry")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
