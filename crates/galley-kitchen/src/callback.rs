//! Readiness push from the kitchen back to the order service.
//!
//! A single `POST` with an empty body to a URL rendered from a template. The
//! push is best effort: whatever happens is logged, counted, and returned to
//! the completion task as a [`CallbackOutcome`], never raised. The order is
//! already `READY` by the time this runs and stays that way.

use crate::model::KitchenOrder;
use core::{fmt, time::Duration};
use galley_core::{telemetry::record_callback, wire::CALLBACK_SECRET_HEADER};
use uuid::Uuid;

#[derive(Clone, PartialEq, Eq)]
pub struct CallbackConfig {
    /// May contain the literal placeholders `{orderId}` and
    /// `{kitchenOrderId}`.
    pub url_template: String,
    /// Sent as `X-Callback-Secret` when present.
    pub secret: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for CallbackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackConfig")
            .field("url_template", &self.url_template)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// What became of one readiness push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The order service answered with a 2xx status.
    Delivered(u16),
    /// The order service answered with a non-2xx status.
    Rejected(u16),
    /// No response: timeout, refused connection, bad URL.
    Failed(String),
}

impl CallbackOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Delivered(_) => "delivered",
            Self::Rejected(_) => "rejected",
            Self::Failed(_) => "failed",
        }
    }
}

/// Substitutes the order ids into a callback URL template.
pub fn render_callback_url(template: &str, order_id: Uuid, kitchen_order_id: Uuid) -> String {
    template
        .replace("{orderId}", &order_id.to_string())
        .replace("{kitchenOrderId}", &kitchen_order_id.to_string())
}

pub struct CallbackNotifier {
    client: reqwest::Client,
    config: CallbackConfig,
}

impl CallbackNotifier {
    pub fn new(config: CallbackConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CallbackConfig {
        &self.config
    }

    pub fn target_url(&self, order: &KitchenOrder) -> String {
        render_callback_url(&self.config.url_template, order.source_order_id, order.id)
    }

    /// Tells the order service that `order` is ready.
    pub async fn notify_ready(&self, order: &KitchenOrder) -> CallbackOutcome {
        let url = self.target_url(order);
        let mut request = self.client.post(&url);
        if let Some(secret) = &self.config.secret {
            request = request.header(CALLBACK_SECRET_HEADER, secret);
        }

        let outcome = match request.send().await {
            Ok(response) if response.status().is_success() => {
                let status = response.status().as_u16();
                tracing::info!(
                    order_id = %order.source_order_id,
                    kitchen_order_id = %order.id,
                    status,
                    "Kitchen-ready callback delivered"
                );
                CallbackOutcome::Delivered(status)
            }
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::warn!(
                    url = %url,
                    kitchen_order_id = %order.id,
                    status,
                    "Kitchen-ready callback rejected"
                );
                CallbackOutcome::Rejected(status)
            }
            Err(err) => {
                tracing::warn!(
                    url = %url,
                    kitchen_order_id = %order.id,
                    error = %err,
                    is_connect = err.is_connect(),
                    is_timeout = err.is_timeout(),
                    "Kitchen-ready callback failed"
                );
                CallbackOutcome::Failed(err.to_string())
            }
        };
        record_callback(outcome.label());
        outcome
    }
}
