//! Outbound calls from the order service to the kitchen service.
//!
//! One request per call, bounded by the client-wide timeout, never retried.
//! Every way a call can go wrong ends up as a [`KitchenRpcError`] so callers
//! can tell "the kitchen said no" apart from local failures.

use crate::error::KitchenRpcError;
use core::time::Duration;
use galley_core::wire::{CreateKitchenOrderRequest, KitchenOrderResponse, UpdateStatusRequest};
use serde::de::DeserializeOwned;
use uuid::Uuid;

#[derive(Clone)]
pub struct KitchenRpcClient {
    client: reqwest::Client,
    base_url: String,
}

impl KitchenRpcClient {
    /// `base_url` is the kitchen service root, e.g. `http://kitchen-svc:8081`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, KitchenRpcError> {
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|err| KitchenRpcError::InvalidUrl(format!("{base_url}: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(KitchenRpcError::InvalidUrl(format!(
                "{base_url}: unsupported scheme"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(KitchenRpcError::Transport)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn create_kitchen_order(
        &self,
        source_order_id: Uuid,
        items_payload: &str,
    ) -> Result<KitchenOrderResponse, KitchenRpcError> {
        let request = self
            .client
            .post(self.url("/orders"))
            .json(&CreateKitchenOrderRequest::new(source_order_id, items_payload));
        decode(self.send(request).await?).await
    }

    pub async fn get_kitchen_order(&self, id: Uuid) -> Result<KitchenOrderResponse, KitchenRpcError> {
        let request = self.client.get(self.url(&format!("/orders/{id}")));
        decode(self.send(request).await?).await
    }

    /// Passes `status` through verbatim; the kitchen validates it.
    pub async fn update_kitchen_order_status(
        &self,
        id: Uuid,
        status: &str,
    ) -> Result<KitchenOrderResponse, KitchenRpcError> {
        let request = self
            .client
            .put(self.url(&format!("/orders/{id}/status")))
            .json(&UpdateStatusRequest::new(status));
        decode(self.send(request).await?).await
    }

    pub async fn cancel_kitchen_order(&self, id: Uuid) -> Result<(), KitchenRpcError> {
        let request = self.client.post(self.url(&format!("/orders/{id}/cancel")));
        self.send(request).await?;
        Ok(())
    }

    /// Every kitchen order created for `source_order_id`, oldest first.
    pub async fn list_by_source_order(
        &self,
        source_order_id: Uuid,
    ) -> Result<Vec<KitchenOrderResponse>, KitchenRpcError> {
        let request = self
            .client
            .get(self.url(&format!("/orders/by-order/{source_order_id}")));
        decode(self.send(request).await?).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, KitchenRpcError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    is_connect = err.is_connect(),
                    is_timeout = err.is_timeout(),
                    "Kitchen request failed"
                );
                return Err(KitchenRpcError::Transport(err));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            status = status.as_u16(),
            body = %excerpt(&body),
            "Kitchen returned error status"
        );
        Err(KitchenRpcError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, KitchenRpcError> {
    let bytes = response.bytes().await.map_err(KitchenRpcError::Transport)?;
    serde_json::from_slice(&bytes).map_err(KitchenRpcError::Decode)
}
