//! # Kitchen Order Lifecycle
//!
//! [`KitchenOrderLifecycle`] is the single writer-facing entry point for
//! kitchen orders. It accepts new orders, arms their completion timers, and
//! validates explicit status changes against the transition table in
//! [`crate::transition`].
//!
//! The completion timer and the explicit entry points race on the same rows.
//! Every write goes through [`KitchenOrderStore::update`], so the timer's
//! "still open?" check and its `READY` write happen under the same row lock a
//! concurrent cancel would need.

use crate::{
    callback::{CallbackNotifier, CallbackOutcome},
    error::{KitchenError, StoreError},
    model::KitchenOrder,
    schedule::{CompletionScheduler, PrepDelay},
    store::KitchenOrderStore,
    transition::{check_cancel, check_transition, is_open},
};
use galley_core::{KitchenStatus, telemetry};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepSettings {
    pub delay: PrepDelay,
    /// When `false`, orders stay where they are until explicitly updated.
    pub enabled: bool,
}

impl Default for PrepSettings {
    fn default() -> Self {
        Self {
            delay: PrepDelay::default(),
            enabled: true,
        }
    }
}

/// Result of one run of the completion step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The order was deleted before the timer fired.
    Missing,
    /// The order had already left the open states; nothing was written.
    Skipped(KitchenStatus),
    /// The order is now `READY`. `callback` is `None` when no push is
    /// configured.
    Ready {
        order: KitchenOrder,
        callback: Option<CallbackOutcome>,
    },
    /// The store refused the read or the write.
    Failed(String),
}

impl CompletionOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Skipped(_) => "skipped",
            Self::Ready { .. } => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

pub struct KitchenOrderLifecycle<S> {
    store: Arc<S>,
    scheduler: Arc<CompletionScheduler>,
    notifier: Option<Arc<CallbackNotifier>>,
    prep: PrepSettings,
}

impl<S: KitchenOrderStore> KitchenOrderLifecycle<S> {
    /// `notifier` should be `None` when callbacks are disabled or no URL is
    /// configured.
    pub fn new(
        store: Arc<S>,
        scheduler: Arc<CompletionScheduler>,
        notifier: Option<CallbackNotifier>,
        prep: PrepSettings,
    ) -> Self {
        Self {
            store,
            scheduler,
            notifier: notifier.map(Arc::new),
            prep,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<CompletionScheduler> {
        &self.scheduler
    }

    pub const fn prep(&self) -> PrepSettings {
        self.prep
    }

    /// Accepts an order in `PREPARING` and arms its completion timer.
    ///
    /// # Errors
    ///
    /// Store failures are returned as-is; nothing is retried and no timer is
    /// armed.
    pub fn create(
        &self,
        source_order_id: Uuid,
        items_payload: String,
    ) -> Result<KitchenOrder, KitchenError> {
        let order = self
            .store
            .insert(KitchenOrder::accept(source_order_id, items_payload))?;
        telemetry::increment_kitchen_orders_created();
        tracing::info!(
            kitchen_order_id = %order.id,
            order_id = %order.source_order_id,
            "Kitchen order accepted"
        );

        if self.prep.enabled {
            self.schedule_completion(order.id);
        }
        Ok(order)
    }

    fn schedule_completion(&self, id: Uuid) {
        let delay = self.prep.delay.sample(&mut rand::rng());
        telemetry::record_prep_delay(delay.as_secs_f64());

        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        let armed = self.scheduler.schedule(delay, async move {
            run_completion(&*store, notifier.as_deref(), id).await;
        });

        if armed {
            tracing::debug!(kitchen_order_id = %id, delay_secs = delay.as_secs(), "Completion scheduled");
        } else {
            tracing::warn!(kitchen_order_id = %id, "Scheduler shutting down; completion not scheduled");
        }
    }

    /// Runs the completion step for `id` immediately, exactly as the timer
    /// would.
    pub async fn complete_order(&self, id: Uuid) -> CompletionOutcome {
        run_completion(&*self.store, self.notifier.as_deref(), id).await
    }

    /// Moves an order to `status` if the transition table allows it.
    pub fn update_status(
        &self,
        id: Uuid,
        status: KitchenStatus,
    ) -> Result<KitchenOrder, KitchenError> {
        let (previous, order) = self
            .store
            .update(id, |order| -> Result<_, KitchenError> {
                check_transition(order.status, status)
                    .map_err(|reason| KitchenError::InvalidTransition { id, reason })?;
                let previous = order.set_status(status);
                Ok((previous, order.clone()))
            })?
            .ok_or(KitchenError::NotFound(id))?;

        tracing::info!(kitchen_order_id = %id, from = %previous, to = %status, "Kitchen order status updated");
        Ok(order)
    }

    /// Cancels an open order. The pending timer is left alone; it will find
    /// the order cancelled and do nothing.
    pub fn cancel_order(&self, id: Uuid) -> Result<KitchenOrder, KitchenError> {
        let (previous, order) = self
            .store
            .update(id, |order| -> Result<_, KitchenError> {
                check_cancel(order.status)
                    .map_err(|reason| KitchenError::InvalidTransition { id, reason })?;
                let previous = order.set_status(KitchenStatus::Cancelled);
                Ok((previous, order.clone()))
            })?
            .ok_or(KitchenError::NotFound(id))?;

        tracing::info!(kitchen_order_id = %id, from = %previous, "Kitchen order cancelled");
        Ok(order)
    }

    /// Deletes unconditionally. Returns whether the order existed.
    pub fn delete(&self, id: Uuid) -> Result<bool, KitchenError> {
        let existed = self.store.delete(id)?;
        tracing::info!(kitchen_order_id = %id, existed, "Kitchen order deleted");
        Ok(existed)
    }

    pub fn find(&self, id: Uuid) -> Result<KitchenOrder, KitchenError> {
        self.store.find(id)?.ok_or(KitchenError::NotFound(id))
    }

    pub fn find_by_order_id(&self, source_order_id: Uuid) -> Result<Vec<KitchenOrder>, KitchenError> {
        Ok(self.store.find_by_source_order(source_order_id)?)
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

async fn run_completion<S: KitchenOrderStore>(
    store: &S,
    notifier: Option<&CallbackNotifier>,
    id: Uuid,
) -> CompletionOutcome {
    // Inner `Err` carries the status that made the timer stand down.
    let result = store.update(
        id,
        |order| -> Result<Result<KitchenOrder, KitchenStatus>, StoreError> {
            if !is_open(order.status) {
                return Ok(Err(order.status));
            }
            order.set_status(KitchenStatus::Ready);
            Ok(Ok(order.clone()))
        },
    );

    let outcome = match result {
        Ok(None) => {
            tracing::debug!(kitchen_order_id = %id, "Kitchen order gone before completion");
            CompletionOutcome::Missing
        }
        Ok(Some(Err(status))) => {
            tracing::debug!(kitchen_order_id = %id, %status, "Completion skipped");
            CompletionOutcome::Skipped(status)
        }
        Ok(Some(Ok(order))) => {
            tracing::info!(
                kitchen_order_id = %order.id,
                order_id = %order.source_order_id,
                "Kitchen order ready"
            );
            let callback = match notifier {
                Some(notifier) => Some(notifier.notify_ready(&order).await),
                None => None,
            };
            CompletionOutcome::Ready { order, callback }
        }
        Err(err) => {
            tracing::error!(kitchen_order_id = %id, error = %err, "Completion failed");
            CompletionOutcome::Failed(err.to_string())
        }
    };
    telemetry::record_completion(outcome.label());
    outcome
}
