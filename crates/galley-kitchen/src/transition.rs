//! # Kitchen Order State Machine
//!
//! ```text
//! NEW ──► PREPARING ──► IN_PROGRESS ──► READY ──► SERVED ──► COMPLETED
//!  │  └──────────────────►┘  └───────────►┘  └──────────────────►┘
//!  └──────────────► CANCELLED ◄── (any open state)
//! ```
//!
//! Statuses before `READY` are *open*: the completion timer may still act on
//! them and they may be cancelled. Everything else is settled as far as the
//! timer is concerned; explicit updates can still move a settled order
//! forward (`READY → SERVED → COMPLETED`) but never backward.

use galley_core::KitchenStatus::{self, *};

/// Why a requested status change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Invalid status transition from {from} to {to}")]
    Invalid {
        from: KitchenStatus,
        to: KitchenStatus,
    },

    #[error("order is cancelled and cannot be modified")]
    Cancelled,

    #[error("order is already cancelled")]
    AlreadyCancelled,

    #[error("order cannot be cancelled in state {0}")]
    NotCancellable(KitchenStatus),
}

/// Statuses the completion timer may still move to `READY`, and from which
/// cancellation is allowed.
pub const fn is_open(status: KitchenStatus) -> bool {
    matches!(status, New | Preparing | InProgress)
}

/// Targets reachable from `from` through an explicit status update.
pub const fn allowed_targets(from: KitchenStatus) -> &'static [KitchenStatus] {
    match from {
        New => &[Preparing, InProgress, Cancelled],
        Preparing => &[InProgress, Ready, Cancelled],
        InProgress => &[Ready, Cancelled],
        Ready => &[Served, Completed],
        Served => &[Completed],
        Completed | Cancelled => &[],
    }
}

/// Validates an explicit `from → to` status update.
pub fn check_transition(from: KitchenStatus, to: KitchenStatus) -> Result<(), TransitionError> {
    if from == Cancelled {
        return Err(TransitionError::Cancelled);
    }
    if allowed_targets(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::Invalid { from, to })
    }
}

/// Validates a dedicated cancel request.
pub fn check_cancel(from: KitchenStatus) -> Result<(), TransitionError> {
    match from {
        Cancelled => Err(TransitionError::AlreadyCancelled),
        s if is_open(s) => Ok(()),
        s => Err(TransitionError::NotCancellable(s)),
    }
}
