//! # Kitchen Status Vocabulary
//!
//! [`KitchenStatus`] is the fixed set of states a kitchen order moves through.
//! It is serialized as its `SCREAMING_SNAKE_CASE` name, which is also the
//! exact string the order side stores in its status mirror.
//!
//! Parsing is lenient about whitespace and case (`" ready "` parses as
//! [`KitchenStatus::Ready`]) but strict about the vocabulary itself: anything
//! outside the set is an [`UnknownStatus`] error, never a silent default.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Preparation state of a kitchen order.
///
/// Declaration order follows the forward progression of an order through the
/// kitchen; [`Cancelled`](KitchenStatus::Cancelled) sits outside that
/// progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KitchenStatus {
    New,
    Preparing,
    InProgress,
    Ready,
    Served,
    Completed,
    Cancelled,
}

impl KitchenStatus {
    /// Every status, in progression order.
    pub const ALL: [KitchenStatus; 7] = [
        Self::New,
        Self::Preparing,
        Self::InProgress,
        Self::Ready,
        Self::Served,
        Self::Completed,
        Self::Cancelled,
    ];

    /// The canonical wire name of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Preparing => "PREPARING",
            Self::InProgress => "IN_PROGRESS",
            Self::Ready => "READY",
            Self::Served => "SERVED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for KitchenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`KitchenStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kitchen status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for KitchenStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
