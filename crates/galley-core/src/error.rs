//! JSON error body shared by every endpoint of both services.
//!
//! - `message`: always present, safe to show to callers.
//! - `errors`: per-field reasons, only for validation failures.
//! - `detail`: upstream diagnostics, only when a peer service failed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn validation(errors: BTreeMap<String, String>) -> Self {
        Self {
            message: "Validation failed".to_string(),
            errors: Some(errors),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
