//! Order-side records.
//!
//! [`Order::kitchen_status`] is a courtesy mirror of the last status string
//! the kitchen reported. It is never parsed back into [`OrderStatus`] and may
//! be stale; it may also hold one of the local failure markers
//! ([`KITCHEN_NOTIFY_FAILED`], [`CANCEL_NOTIFY_FAILED`]).

use crate::translate;
use chrono::{DateTime, Utc};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mirror value after the kitchen order could not be created.
pub const KITCHEN_NOTIFY_FAILED: &str = "kitchen_notify_failed";
/// Mirror value after a local cancel could not be forwarded to the kitchen.
pub const CANCEL_NOTIFY_FAILED: &str = "cancel_notify_failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Processing,
    Ready,
    Completed,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::New,
        Self::Processing,
        Self::Ready,
        Self::Completed,
        Self::Paid,
        Self::Cancelled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Ready => "READY",
            Self::Completed => "COMPLETED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status `{0}`")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownOrderStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderItemStatus {
    Pending,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub menu_item_name: String,
    pub quantity: u32,
    /// Whether the kitchen prepares this item. Drinks and the like are not
    /// sent to the kitchen and never follow its status.
    pub kitchen_item: bool,
    pub status: OrderItemStatus,
}

impl OrderItem {
    pub fn new(menu_item_name: impl Into<String>, quantity: u32, kitchen_item: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            menu_item_name: menu_item_name.into(),
            quantity,
            kitchen_item,
            status: OrderItemStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub table_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub waiter_id: Option<Uuid>,
    pub status: OrderStatus,
    pub kitchen_order_id: Option<Uuid>,
    pub kitchen_status: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(table_id: Option<Uuid>, customer_id: Option<Uuid>, items: Vec<OrderItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            table_id,
            customer_id,
            waiter_id: None,
            status: OrderStatus::New,
            kitchen_order_id: None,
            kitchen_status: None,
            items,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn kitchen_items(&self) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(|item| item.kitchen_item)
    }

    /// JSON array describing the kitchen items, as sent to the kitchen.
    pub fn kitchen_payload(&self) -> String {
        let lines: Vec<serde_json::Value> = self
            .kitchen_items()
            .map(|item| {
                serde_json::json!({
                    "itemId": item.id,
                    "menuItemName": item.menu_item_name,
                    "quantity": item.quantity,
                })
            })
            .collect();
        serde_json::Value::Array(lines).to_string()
    }

    /// Assigns the first waiter to claim the order. Returns `false` if a
    /// waiter already holds it.
    pub fn claim_by_waiter(&mut self, waiter_id: Uuid) -> bool {
        if self.waiter_id.is_some() {
            return false;
        }
        self.waiter_id = Some(waiter_id);
        if self.status == OrderStatus::New {
            self.status = OrderStatus::Processing;
        }
        self.touch();
        true
    }

    /// Order-side status is deliberately loose; any move is accepted.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.touch();
    }

    pub fn set_kitchen_status(&mut self, kitchen_status: impl Into<String>) {
        self.kitchen_status = Some(kitchen_status.into());
        self.touch();
    }

    /// Applies the kitchen's readiness push.
    ///
    /// Kitchen items become `READY`; the order itself becomes `READY` unless
    /// it has already moved past preparation or been cancelled.
    pub fn mark_kitchen_ready(&mut self, kitchen_order_id: Option<Uuid>) {
        if let Some(id) = kitchen_order_id {
            self.kitchen_order_id = Some(id);
        }
        for item in self.items.iter_mut().filter(|item| item.kitchen_item) {
            if item.status != OrderItemStatus::Cancelled {
                item.status = OrderItemStatus::Ready;
            }
        }
        if matches!(self.status, OrderStatus::New | OrderStatus::Processing) {
            self.status = OrderStatus::Ready;
        }
        self.set_kitchen_status(galley_core::KitchenStatus::Ready.as_str());
    }

    /// Copies a kitchen snapshot onto the order; see
    /// [`follow_kitchen_status`](Self::follow_kitchen_status).
    pub fn apply_kitchen_snapshot(&mut self, kitchen_order_id: Uuid, kitchen_status: &str) {
        self.kitchen_order_id = Some(kitchen_order_id);
        self.follow_kitchen_status(kitchen_status);
    }

    /// Records a status the kitchen reported.
    ///
    /// The mirror always takes the raw value. A recognised value also moves
    /// the kitchen items. A terminal value settles the order itself, but only
    /// when the kitchen prepares every item; otherwise the remaining items
    /// still need serving and the order status is left alone.
    pub fn follow_kitchen_status(&mut self, kitchen_status: &str) {
        let raw = Some(kitchen_status);
        if let Some(mapped) = translate::to_item_status(raw) {
            for item in self.items.iter_mut().filter(|item| item.kitchen_item) {
                item.status = mapped;
            }
        }
        if self.is_kitchen_only() && translate::is_terminal(raw) {
            self.status = translate::to_order_status_or_default(raw);
        }
        self.set_kitchen_status(kitchen_status);
    }

    fn is_kitchen_only(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.kitchen_item)
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
