//! JSON bodies exchanged between the order service and the kitchen service.
//!
//! All field names are `camelCase` on the wire. Kitchen status travels as a
//! plain string in both directions; the kitchen side validates it against
//! [`KitchenStatus`](crate::KitchenStatus), the order side mirrors it
//! verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the shared secret on kitchen → order callbacks.
pub const CALLBACK_SECRET_HEADER: &str = "X-Callback-Secret";

/// Body of `POST /orders` on the kitchen service.
///
/// The older `orderId` / `itemsJson` field names are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKitchenOrderRequest {
    #[serde(alias = "orderId")]
    pub source_order_id: Option<Uuid>,
    #[serde(alias = "itemsJson")]
    pub items_payload: Option<String>,
}

impl CreateKitchenOrderRequest {
    pub fn new(source_order_id: Uuid, items_payload: impl Into<String>) -> Self {
        Self {
            source_order_id: Some(source_order_id),
            items_payload: Some(items_payload.into()),
        }
    }
}

/// Body of `PUT .../status` on both services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

impl UpdateStatusRequest {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
        }
    }
}

/// A kitchen order as rendered by the kitchen service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenOrderResponse {
    pub id: Uuid,
    #[serde(alias = "orderId")]
    pub source_order_id: Uuid,
    #[serde(default)]
    pub items_payload: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Acknowledgement returned by the order service after forwarding a status
/// change to the kitchen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAck {
    pub kitchen_order_id: Uuid,
    pub status: String,
}
