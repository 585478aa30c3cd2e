//! Error types for the order service.
//!
//! Failures of the kitchen service ([`KitchenRpcError`]) are kept apart from
//! local failures ([`StoreError`]) all the way up to the HTTP layer, where the
//! former become `502` and the latter `500`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use galley_core::ErrorBody;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("order store unavailable: {0}")]
    Unavailable(String),
}

/// A call to the kitchen service did not produce a usable answer.
#[derive(Debug, thiserror::Error)]
pub enum KitchenRpcError {
    #[error("kitchen service unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("kitchen service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable kitchen response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid kitchen url: {0}")]
    InvalidUrl(String),
}

impl KitchenRpcError {
    /// The kitchen's HTTP status, when it answered at all.
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Kitchen service unavailable")]
    UpstreamUnavailable(#[from] KitchenRpcError),

    #[error("internal failure")]
    Internal(#[from] StoreError),
}

/// Everything an order-service handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum OrderApiError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid or missing callback secret")]
    Unauthorized,

    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("Kitchen service unavailable")]
    Upstream(#[source] KitchenRpcError),

    #[error("Internal error")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl OrderApiError {
    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), reason.into());
        Self::Validation(errors)
    }

    /// Collapses every failure into `Internal`, for routes whose contract
    /// only distinguishes success from internal failure.
    pub fn into_internal(self) -> Self {
        match self {
            Self::Internal(_) => self,
            other => Self::Internal(Box::new(other)),
        }
    }
}

impl From<ReconcileError> for OrderApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::NotFound(id) => Self::NotFound(id),
            ReconcileError::UpstreamUnavailable(rpc) => Self::Upstream(rpc),
            ReconcileError::Internal(store) => Self::Internal(Box::new(store)),
        }
    }
}

impl IntoResponse for OrderApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, ErrorBody::new(self.to_string())),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, ErrorBody::new(self.to_string())),
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::validation(errors.clone()),
            ),
            Self::Upstream(rpc) => {
                tracing::error!(
                    error = %rpc,
                    upstream_status = ?rpc.upstream_status(),
                    "kitchen service call failed"
                );
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody::new(self.to_string()).with_detail(rpc.to_string()),
                )
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "order service internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new(self.to_string()),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
