//! HTTP surface of the order service.
//!
//! The `/internal` routes are called by the kitchen service and by operator
//! tooling; the `/orders` routes are the minimal public surface needed to
//! create, read, claim, re-status and cancel orders.
//!
//! Extractors come from [`crate::extract`], so malformed bodies, paths and
//! query strings are answered with a JSON `400` like any other validation
//! failure.

use crate::{
    error::OrderApiError,
    extract::{Json, Path, Query},
    model::{Order, OrderItem, OrderStatus},
    reconcile::Reconciler,
    store::OrderStore,
};
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::LOCATION},
    response::IntoResponse,
    routing::{get, post, put},
};
use galley_core::wire::{CALLBACK_SECRET_HEADER, StatusAck, UpdateStatusRequest};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use uuid::Uuid;

pub struct AppState<S> {
    pub reconciler: Arc<Reconciler<S>>,
    /// When set, kitchen-ready callbacks must carry it in
    /// `X-Callback-Secret`.
    pub callback_secret: Option<String>,
}

// Derived Clone would require `S: Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            reconciler: Arc::clone(&self.reconciler),
            callback_secret: self.callback_secret.clone(),
        }
    }
}

pub fn routes<S: OrderStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/internal/ping", get(ping))
        .route(
            "/internal/orders/{id}/kitchen-ready",
            post(kitchen_ready::<S>),
        )
        .route("/internal/orders/{id}/status", put(forward_status::<S>))
        .route("/internal/orders/{id}/cancel", post(forward_cancel::<S>))
        .route("/orders", post(create_order::<S>))
        .route("/orders/{id}", get(get_order::<S>))
        .route("/orders/{id}/cancel", post(cancel_order::<S>))
        .route("/orders/{id}/claim", put(claim_order::<S>))
        .route("/orders/{id}/status", put(update_order_status::<S>))
}

async fn ping() -> &'static str {
    "pong"
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KitchenReadyParams {
    kitchen_order_id: Option<Uuid>,
}

fn check_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), OrderApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let given = headers
        .get(CALLBACK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    if given == Some(expected) {
        Ok(())
    } else {
        tracing::warn!(present = given.is_some(), "Rejected kitchen callback with bad secret");
        Err(OrderApiError::Unauthorized)
    }
}

async fn kitchen_ready<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(order_id): Path<Uuid>,
    Query(params): Query<KitchenReadyParams>,
    headers: HeaderMap,
) -> Result<StatusCode, OrderApiError> {
    check_secret(state.callback_secret.as_deref(), &headers)?;
    state
        .reconciler
        .on_kitchen_ready(order_id, params.kitchen_order_id)
        .map_err(|err| OrderApiError::from(err).into_internal())?;
    Ok(StatusCode::OK)
}

async fn forward_status<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(kitchen_order_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<StatusAck>, OrderApiError> {
    let status = match body.status.as_deref().map(str::trim) {
        None | Some("") => return Err(OrderApiError::invalid_field("status", "must not be blank")),
        Some(status) => status,
    };
    let ack = state
        .reconciler
        .forward_status_update(kitchen_order_id, status)
        .await?;
    Ok(Json(ack))
}

async fn forward_cancel<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(kitchen_order_id): Path<Uuid>,
) -> Result<StatusCode, OrderApiError> {
    state.reconciler.forward_cancel(kitchen_order_id).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub table_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    #[serde(default)]
    pub menu_item_name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default = "kitchen_item_default")]
    pub kitchen_item: bool,
}

const fn kitchen_item_default() -> bool {
    true
}

impl CreateOrderRequest {
    /// Checks every line and reports all problems at once.
    pub fn validate(self) -> Result<(Option<Uuid>, Option<Uuid>, Vec<OrderItem>), OrderApiError> {
        let mut errors = BTreeMap::new();
        if self.items.is_empty() {
            errors.insert("items".to_string(), "must not be empty".to_string());
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.menu_item_name.trim().is_empty() {
                errors.insert(format!("items[{i}].menuItemName"), "must not be blank".to_string());
            }
            if item.quantity == 0 {
                errors.insert(format!("items[{i}].quantity"), "must be greater than 0".to_string());
            }
        }
        if !errors.is_empty() {
            return Err(OrderApiError::Validation(errors));
        }

        let items = self
            .items
            .into_iter()
            .map(|item| OrderItem::new(item.menu_item_name.trim(), item.quantity, item.kitchen_item))
            .collect();
        Ok((self.table_id, self.customer_id, items))
    }
}

async fn create_order<S: OrderStore>(
    State(state): State<AppState<S>>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, OrderApiError> {
    let (table_id, customer_id, items) = body.validate()?;
    let order = state
        .reconciler
        .place_order(table_id, customer_id, items)
        .await?;
    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/orders/{}", order.id))],
        Json(order),
    ))
}

#[derive(Debug, Default, Deserialize)]
struct GetOrderParams {
    #[serde(default)]
    refresh: bool,
}

async fn get_order<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(order_id): Path<Uuid>,
    Query(params): Query<GetOrderParams>,
) -> Result<Json<Order>, OrderApiError> {
    let order = if params.refresh {
        state.reconciler.refresh_from_kitchen(order_id).await?
    } else {
        state.reconciler.find(order_id)?
    };
    Ok(Json(order))
}

async fn cancel_order<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, OrderApiError> {
    Ok(Json(state.reconciler.cancel_order(order_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub waiter_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub claimed: bool,
}

fn parse_waiter_id(raw: Option<&str>) -> Result<Uuid, OrderApiError> {
    match raw.map(str::trim) {
        None | Some("") => Err(OrderApiError::invalid_field("waiterId", "must not be blank")),
        Some(raw) => raw
            .parse()
            .map_err(|_| OrderApiError::invalid_field("waiterId", "must be a UUID")),
    }
}

async fn claim_order<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, OrderApiError> {
    let waiter_id = parse_waiter_id(body.waiter_id.as_deref())?;
    let claimed = state.reconciler.claim_order(order_id, waiter_id)?;
    Ok(Json(ClaimResponse { claimed }))
}

/// Parses an order-side status, rejecting blanks and unknown values as
/// validation failures on the `status` field.
pub fn parse_order_status(raw: Option<&str>) -> Result<OrderStatus, OrderApiError> {
    match raw.map(str::trim) {
        None | Some("") => Err(OrderApiError::invalid_field("status", "must not be blank")),
        Some(raw) => raw
            .parse()
            .map_err(|err: crate::model::UnknownOrderStatus| {
                OrderApiError::invalid_field("status", err.to_string())
            }),
    }
}

async fn update_order_status<S: OrderStore>(
    State(state): State<AppState<S>>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, OrderApiError> {
    let status = parse_order_status(body.status.as_deref())?;
    Ok(Json(state.reconciler.update_order_status(order_id, status)?))
}
