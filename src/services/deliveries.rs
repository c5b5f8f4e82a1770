use crate::{
    entities::{delivery, purchase_order, Delivery},
    errors::{is_unique_violation, ServiceError},
    events::{Event, EventSender},
};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Warehouse address used for every inbound delivery.
pub const INBOUND_ADDRESS: &str = "Entrepôt principal";
/// Carrier placeholder until dispatch assigns a real one.
pub const UNASSIGNED_CARRIER: &str = "À assigner";
/// Days between confirmation and the planned arrival.
const SCHEDULED_LEAD_DAYS: i64 = 3;

/// Delivery service. Deliveries are derived from confirmed purchase orders,
/// never created free-standing; the unique index on `purchase_order_id` is
/// the idempotency mechanism, so deriving twice is a silent no-op.
#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl DeliveryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Display label tying a delivery back to its purchase order. Legacy
    /// clients parse this, so the shape is frozen.
    pub fn client_label(supplier_name: &str, purchase_order_id: i64) -> String {
        format!("{} (PO-{})", supplier_name, purchase_order_id)
    }

    /// Derives the inbound delivery for a freshly confirmed purchase order,
    /// inside the caller's transaction.
    ///
    /// Returns `Ok(None)` when the delivery already exists; the insert-and-
    /// catch-unique-violation shape makes concurrent derivations safe
    /// without a pre-check read.
    pub async fn derive_in_txn<C: ConnectionTrait>(
        &self,
        conn: &C,
        po: &purchase_order::Model,
        supplier_name: &str,
        parcel_count: i32,
    ) -> Result<Option<delivery::Model>, ServiceError> {
        let now = Utc::now();
        let inserted = delivery::ActiveModel {
            purchase_order_id: Set(po.id),
            client: Set(Self::client_label(supplier_name, po.id)),
            address: Set(INBOUND_ADDRESS.to_string()),
            carrier: Set(UNASSIGNED_CARRIER.to_string()),
            status: Set(delivery::DeliveryStatus::Preparing),
            parcel_count: Set(parcel_count),
            scheduled_date: Set(now + Duration::days(SCHEDULED_LEAD_DAYS)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await;

        match inserted {
            Ok(model) => Ok(Some(model)),
            Err(e) if is_unique_violation(&e) => {
                info!(purchase_order_id = po.id, "delivery already derived");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns one delivery.
    #[instrument(skip(self))]
    pub async fn get_delivery(&self, delivery_id: i64) -> Result<delivery::Model, ServiceError> {
        Delivery::find_by_id(delivery_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", delivery_id)))
    }

    /// Lists deliveries, newest first.
    #[instrument(skip(self))]
    pub async fn list_deliveries(&self) -> Result<Vec<delivery::Model>, ServiceError> {
        let deliveries = Delivery::find()
            .order_by_desc(delivery::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(deliveries)
    }

    /// Moves a delivery along prepare -> en_route -> livre.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        delivery_id: i64,
        new_status: delivery::DeliveryStatus,
    ) -> Result<delivery::Model, ServiceError> {
        use delivery::DeliveryStatus::*;

        let txn = self.db.begin().await?;

        let existing = Delivery::find_by_id(delivery_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", delivery_id)))?;

        let allowed = matches!(
            (existing.status, new_status),
            (Preparing, EnRoute) | (EnRoute, Delivered)
        );
        if !allowed {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move delivery from {} to {}",
                existing.status.as_str(),
                new_status.as_str()
            )));
        }

        let mut active: delivery::ActiveModel = existing.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::DeliveryStatusChanged {
                delivery_id,
                new_status: new_status.as_str().to_string(),
            })
            .await;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_label_shape_is_stable() {
        assert_eq!(
            DeliveryService::client_label("Michelin Tunisie", 42),
            "Michelin Tunisie (PO-42)"
        );
    }
}
