use chrono::{DateTime, Utc};
use galley_core::{KitchenStatus, wire::KitchenOrderResponse};
use uuid::Uuid;

/// The kitchen's record of one source order's items being prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KitchenOrder {
    pub id: Uuid,
    pub source_order_id: Uuid,
    /// Opaque to the kitchen; usually a JSON array of line items.
    pub items_payload: String,
    pub status: KitchenStatus,
    pub created_at: DateTime<Utc>,
    /// `None` until the first status change.
    pub updated_at: Option<DateTime<Utc>>,
}

impl KitchenOrder {
    /// A freshly accepted order, already in [`KitchenStatus::Preparing`].
    pub fn accept(source_order_id: Uuid, items_payload: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_order_id,
            items_payload,
            status: KitchenStatus::Preparing,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Moves to `status` and stamps `updated_at`. Returns the previous status.
    pub fn set_status(&mut self, status: KitchenStatus) -> KitchenStatus {
        let previous = self.status;
        self.status = status;
        self.updated_at = Some(Utc::now());
        previous
    }
}

impl From<&KitchenOrder> for KitchenOrderResponse {
    fn from(order: &KitchenOrder) -> Self {
        Self {
            id: order.id,
            source_order_id: order.source_order_id,
            items_payload: Some(order.items_payload.clone()),
            status: order.status.to_string(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
