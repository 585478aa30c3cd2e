//! Error types for the kitchen service.
//!
//! [`KitchenError`] is what the lifecycle manager hands back to the HTTP layer,
//! which turns it into a status code and an [`ErrorBody`]:
//!
//! - `NotFound` → 404
//! - `InvalidTransition` → 409
//! - `Validation` → 400 with a per-field error map
//! - `Store` → 500, logged server-side, generic message to the caller

use crate::transition::TransitionError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use galley_core::ErrorBody;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Failure of the persistence collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("kitchen order store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum KitchenError {
    #[error("Kitchen order not found: {0}")]
    NotFound(Uuid),

    #[error("Kitchen order {id}: {reason}")]
    InvalidTransition {
        id: Uuid,
        #[source]
        reason: TransitionError,
    },

    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl KitchenError {
    /// Single-field validation failure.
    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), reason.into());
        Self::Validation(errors)
    }
}

impl IntoResponse for KitchenError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, ErrorBody::new(self.to_string())),
            Self::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, ErrorBody::new(self.to_string()))
            }
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, ErrorBody::validation(errors)),
            Self::Store(err) => {
                tracing::error!(error = %err, "kitchen order store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("Internal server error"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
