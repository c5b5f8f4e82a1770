use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Events emitted by the services after a transaction commits.
/// Consumers are best-effort; the source of truth stays in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartItemAdded {
        cart_id: i64,
        product_id: i64,
        quantity: i32,
    },
    CartItemRemoved {
        cart_id: i64,
        product_id: i64,
    },
    CartCleared {
        cart_id: i64,
        stock_restored: bool,
    },

    // Stock events
    StockAdjusted {
        product_id: i64,
        delta: i32,
        new_stock: i32,
        reason: String,
    },

    // Sales order events
    OrderCreated {
        order_id: i64,
        order_number: String,
    },
    OrderStatusChanged {
        order_id: i64,
        old_status: String,
        new_status: String,
    },

    // Purchase order events
    PurchaseOrderCreated {
        purchase_order_id: i64,
        order_number: String,
    },
    PurchaseOrderConfirmed {
        purchase_order_id: i64,
    },
    PurchaseOrderReceived {
        purchase_order_id: i64,
    },
    PurchaseOrderCancelled {
        purchase_order_id: i64,
    },

    // Delivery events
    DeliveryCreated {
        delivery_id: i64,
        purchase_order_id: Option<i64>,
    },
    DeliveryStatusChanged {
        delivery_id: i64,
        new_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging on failure instead of propagating it.
    /// Used after commit, where the state change must not be rolled back
    /// because a consumer lagged.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Processes incoming events. Currently this only records them; downstream
/// consumers (notifications, projections) hang off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockAdjusted {
                product_id,
                delta,
                new_stock,
                reason,
            } => {
                info!(
                    product_id,
                    delta, new_stock, reason, "stock adjusted"
                );
            }
            Event::OrderCreated {
                order_id,
                order_number,
            } => {
                info!(order_id, %order_number, "order created");
            }
            Event::DeliveryCreated {
                delivery_id,
                purchase_order_id,
            } => {
                info!(delivery_id, ?purchase_order_id, "delivery created");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event channel closed; stopping event processing loop");
}
