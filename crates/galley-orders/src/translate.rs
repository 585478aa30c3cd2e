//! # Kitchen Status Translation
//!
//! The kitchen reports status as free-form text. These functions map that
//! text onto the order side's own vocabularies. They are total: any input,
//! including `None` and garbage, yields either a mapping or `None`, never a
//! panic.
//!
//! | kitchen text | item status | order status |
//! |---|---|---|
//! | `NEW` | `PENDING` | `NEW` |
//! | `PENDING` | `PENDING` | - |
//! | `PREPARING`, `IN_PROGRESS` | `PREPARING` | `PROCESSING` |
//! | `INPROGRESS` | `PREPARING` | - |
//! | `READY` | `READY` | `READY` |
//! | `SERVED`, `COMPLETED` | `SERVED` | `COMPLETED` |
//! | `CANCELLED`, `CANCELED` | `CANCELLED` | `CANCELLED` |

use crate::model::{OrderItemStatus, OrderStatus};

/// Trims, uppercases, and folds the `CANCELED` spelling.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    let upper = raw?.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }
    if upper == "CANCELED" {
        return Some("CANCELLED".to_string());
    }
    Some(upper)
}

pub fn to_item_status(raw: Option<&str>) -> Option<OrderItemStatus> {
    match normalize(raw)?.as_str() {
        "NEW" | "PENDING" => Some(OrderItemStatus::Pending),
        "PREPARING" | "IN_PROGRESS" | "INPROGRESS" => Some(OrderItemStatus::Preparing),
        "READY" => Some(OrderItemStatus::Ready),
        "SERVED" | "COMPLETED" => Some(OrderItemStatus::Served),
        "CANCELLED" => Some(OrderItemStatus::Cancelled),
        _ => None,
    }
}

pub fn to_order_status(raw: Option<&str>) -> Option<OrderStatus> {
    match normalize(raw)?.as_str() {
        "NEW" => Some(OrderStatus::New),
        "PREPARING" | "IN_PROGRESS" => Some(OrderStatus::Processing),
        "READY" => Some(OrderStatus::Ready),
        "SERVED" | "COMPLETED" => Some(OrderStatus::Completed),
        "CANCELLED" => Some(OrderStatus::Cancelled),
        _ => None,
    }
}

/// [`to_item_status`], falling back to `PENDING`.
pub fn to_item_status_or_default(raw: Option<&str>) -> OrderItemStatus {
    to_item_status(raw).unwrap_or(OrderItemStatus::Pending)
}

/// [`to_order_status`], falling back to `PROCESSING`.
pub fn to_order_status_or_default(raw: Option<&str>) -> OrderStatus {
    to_order_status(raw).unwrap_or(OrderStatus::Processing)
}

/// Whether the kitchen text means the order is finished one way or another.
pub fn is_terminal(raw: Option<&str>) -> bool {
    matches!(
        to_order_status(raw),
        Some(OrderStatus::Completed | OrderStatus::Cancelled)
    )
}
