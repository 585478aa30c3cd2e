//! # Cross-Service Reconciliation
//!
//! The order service never owns kitchen state; it keeps a mirror
//! ([`Order::kitchen_status`]) and refreshes it along three paths:
//!
//! 1. **Push**: the kitchen calls back when an order becomes ready
//!    ([`Reconciler::on_kitchen_ready`]).
//! 2. **Forward**: an operator action is forwarded to the kitchen and the
//!    kitchen's answer is written locally
//!    ([`Reconciler::forward_status_update`], [`Reconciler::forward_cancel`]).
//! 3. **Pull**: the order's kitchen orders are fetched on demand
//!    ([`Reconciler::refresh_from_kitchen`]).
//!
//! Forward and pull also move kitchen items, and settle a kitchen-only order
//! once the kitchen reports a terminal status
//! ([`Order::follow_kitchen_status`]).
//!
//! None of these retry. A failed forward leaves the mirror exactly as it was;
//! a failed submission or local cancel leaves a failure marker in it instead.

use crate::{
    client::KitchenRpcClient,
    error::{ReconcileError, StoreError},
    model::{CANCEL_NOTIFY_FAILED, KITCHEN_NOTIFY_FAILED, Order, OrderItem, OrderStatus},
    store::OrderStore,
};
use galley_core::{KitchenStatus, telemetry::record_forwarded, wire::StatusAck};
use std::sync::Arc;
use uuid::Uuid;

pub struct Reconciler<S> {
    store: Arc<S>,
    kitchen: KitchenRpcClient,
}

impl<S: OrderStore> Reconciler<S> {
    pub fn new(store: Arc<S>, kitchen: KitchenRpcClient) -> Self {
        Self { store, kitchen }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn kitchen(&self) -> &KitchenRpcClient {
        &self.kitchen
    }

    pub fn find(&self, order_id: Uuid) -> Result<Order, ReconcileError> {
        self.store
            .find(order_id)?
            .ok_or(ReconcileError::NotFound(order_id))
    }

    /// Applies the kitchen's readiness push to the local order.
    pub fn on_kitchen_ready(
        &self,
        order_id: Uuid,
        kitchen_order_id: Option<Uuid>,
    ) -> Result<Order, ReconcileError> {
        let order = self
            .store
            .update(order_id, |order| -> Result<_, ReconcileError> {
                order.mark_kitchen_ready(kitchen_order_id);
                Ok(order.clone())
            })?
            .ok_or(ReconcileError::NotFound(order_id))?;

        tracing::info!(
            %order_id,
            kitchen_order_id = ?kitchen_order_id,
            status = %order.status,
            "Kitchen reported order ready"
        );
        Ok(order)
    }

    /// Hands the order to `waiter_id`. Returns `false`, leaving the order
    /// as it was, when another waiter already holds it.
    pub fn claim_order(&self, order_id: Uuid, waiter_id: Uuid) -> Result<bool, ReconcileError> {
        let claimed = self
            .store
            .update(order_id, |order| -> Result<_, ReconcileError> {
                Ok(order.claim_by_waiter(waiter_id))
            })?
            .ok_or(ReconcileError::NotFound(order_id))?;
        tracing::info!(%order_id, %waiter_id, claimed, "Order claim");
        Ok(claimed)
    }

    /// Sets the order's own status. The kitchen is not told.
    pub fn update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, ReconcileError> {
        let order = self
            .store
            .update(order_id, |order| -> Result<_, ReconcileError> {
                order.set_status(status);
                Ok(order.clone())
            })?
            .ok_or(ReconcileError::NotFound(order_id))?;
        tracing::info!(%order_id, %status, "Order status updated");
        Ok(order)
    }

    /// Forwards a status change to the kitchen and mirrors what the kitchen
    /// acknowledged.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::UpstreamUnavailable`] if the kitchen call failed
    ///   in any way; the mirror is untouched.
    /// - [`ReconcileError::Internal`] if the local write failed.
    pub async fn forward_status_update(
        &self,
        kitchen_order_id: Uuid,
        status: &str,
    ) -> Result<StatusAck, ReconcileError> {
        tracing::info!(%kitchen_order_id, status, "Forwarding kitchen status update");
        let acknowledged = match self
            .kitchen
            .update_kitchen_order_status(kitchen_order_id, status)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                record_forwarded("update", "upstream");
                return Err(err.into());
            }
        };

        if let Err(err) = self.mirror(kitchen_order_id, &acknowledged.status) {
            record_forwarded("update", "internal");
            return Err(err);
        }
        record_forwarded("update", "ok");
        Ok(StatusAck {
            kitchen_order_id: acknowledged.id,
            status: acknowledged.status,
        })
    }

    /// Forwards a cancel to the kitchen and mirrors `CANCELLED`.
    pub async fn forward_cancel(&self, kitchen_order_id: Uuid) -> Result<(), ReconcileError> {
        tracing::info!(%kitchen_order_id, "Forwarding kitchen cancel");
        if let Err(err) = self.kitchen.cancel_kitchen_order(kitchen_order_id).await {
            record_forwarded("cancel", "upstream");
            return Err(err.into());
        }

        if let Err(err) = self.mirror(kitchen_order_id, KitchenStatus::Cancelled.as_str()) {
            record_forwarded("cancel", "internal");
            return Err(err);
        }
        record_forwarded("cancel", "ok");
        Ok(())
    }

    /// Applies `kitchen_status` to whichever local order points at
    /// `kitchen_order_id`. No such order is not an error.
    fn mirror(&self, kitchen_order_id: Uuid, kitchen_status: &str) -> Result<(), ReconcileError> {
        let Some(order) = self.store.find_by_kitchen_order_id(kitchen_order_id)? else {
            tracing::debug!(%kitchen_order_id, "No local order for kitchen order; mirror skipped");
            return Ok(());
        };
        self.store
            .update(order.id, |order| -> Result<_, StoreError> {
                order.follow_kitchen_status(kitchen_status);
                Ok(())
            })?;
        Ok(())
    }

    /// Records a new order and, if it has kitchen items, submits them.
    ///
    /// A kitchen failure does not fail the order: it is stored with the
    /// `kitchen_notify_failed` marker and returned.
    pub async fn place_order(
        &self,
        table_id: Option<Uuid>,
        customer_id: Option<Uuid>,
        items: Vec<OrderItem>,
    ) -> Result<Order, ReconcileError> {
        let order = self.store.insert(Order::new(table_id, customer_id, items))?;
        tracing::info!(order_id = %order.id, items = order.items.len(), "Order created");

        if order.kitchen_items().next().is_none() {
            tracing::debug!(order_id = %order.id, "No kitchen items; kitchen not notified");
            return Ok(order);
        }

        match self.submit_to_kitchen(order.id, order.kitchen_payload()).await {
            Ok(order) => Ok(order),
            Err(ReconcileError::UpstreamUnavailable(_)) => self.find(order.id),
            Err(err) => Err(err),
        }
    }

    /// Creates the kitchen order for `order_id` and records its id and
    /// status. On failure the mirror becomes `kitchen_notify_failed`.
    pub async fn submit_to_kitchen(
        &self,
        order_id: Uuid,
        items_payload: String,
    ) -> Result<Order, ReconcileError> {
        self.find(order_id)?;

        match self.kitchen.create_kitchen_order(order_id, &items_payload).await {
            Ok(created) => {
                let order = self
                    .store
                    .update(order_id, |order| -> Result<_, ReconcileError> {
                        order.kitchen_order_id = Some(created.id);
                        order.set_kitchen_status(created.status.as_str());
                        Ok(order.clone())
                    })?
                    .ok_or(ReconcileError::NotFound(order_id))?;
                record_forwarded("create", "ok");
                tracing::info!(%order_id, kitchen_order_id = %created.id, "Kitchen order created");
                Ok(order)
            }
            Err(err) => {
                record_forwarded("create", "upstream");
                tracing::error!(%order_id, error = %err, "Failed to notify kitchen");
                self.set_marker(order_id, KITCHEN_NOTIFY_FAILED);
                Err(err.into())
            }
        }
    }

    /// Cancels locally, then tells the kitchen.
    ///
    /// The local cancellation stands even if the kitchen cannot be told; the
    /// mirror then reads `cancel_notify_failed`.
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<Order, ReconcileError> {
        let order = self
            .store
            .update(order_id, |order| -> Result<_, ReconcileError> {
                order.set_status(OrderStatus::Cancelled);
                Ok(order.clone())
            })?
            .ok_or(ReconcileError::NotFound(order_id))?;
        tracing::info!(%order_id, "Order cancelled");

        let Some(kitchen_order_id) = order.kitchen_order_id else {
            return Ok(order);
        };

        match self.kitchen.cancel_kitchen_order(kitchen_order_id).await {
            Ok(()) => {
                record_forwarded("cancel", "ok");
                tracing::info!(%order_id, %kitchen_order_id, "Kitchen notified of cancel");
                self.set_marker(order_id, KitchenStatus::Cancelled.as_str());
            }
            Err(err) => {
                record_forwarded("cancel", "upstream");
                tracing::error!(
                    %order_id,
                    %kitchen_order_id,
                    error = %err,
                    upstream_status = ?err.upstream_status(),
                    "Failed to notify kitchen of cancel"
                );
                self.set_marker(order_id, CANCEL_NOTIFY_FAILED);
            }
        }
        self.find(order_id)
    }

    /// Pulls the kitchen's view of `order_id` and copies it locally.
    ///
    /// Prefers the kitchen order the local record already points at,
    /// otherwise the oldest one. If the kitchen cannot be reached the local
    /// order is returned unchanged.
    pub async fn refresh_from_kitchen(&self, order_id: Uuid) -> Result<Order, ReconcileError> {
        let order = self.find(order_id)?;

        let snapshots = match self.kitchen.list_by_source_order(order_id).await {
            Ok(snapshots) => snapshots,
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "Failed to fetch kitchen orders");
                return Ok(order);
            }
        };
        let chosen = snapshots
            .iter()
            .find(|snapshot| order.kitchen_order_id == Some(snapshot.id))
            .or_else(|| snapshots.first());
        let Some(chosen) = chosen else {
            return Ok(order);
        };

        self.store
            .update(order_id, |order| -> Result<_, ReconcileError> {
                order.apply_kitchen_snapshot(chosen.id, &chosen.status);
                Ok(order.clone())
            })?
            .ok_or(ReconcileError::NotFound(order_id))
    }

    /// Best-effort mirror write on an error path; a failure here is logged
    /// and otherwise ignored so it never masks the original error.
    fn set_marker(&self, order_id: Uuid, marker: &str) {
        let res = self
            .store
            .update(order_id, |order| -> Result<_, StoreError> {
                order.set_kitchen_status(marker);
                Ok(())
            });
        if let Err(err) = res {
            tracing::warn!(%order_id, marker, error = %err, "Failed to persist kitchen status marker");
        }
    }
}
