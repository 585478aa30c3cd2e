//! HTTP surface of the kitchen service.
//!
//! | route | success |
//! |---|---|
//! | `POST /orders` | `201` + order, `Location: /orders/{id}` |
//! | `GET /orders/{id}` | `200` + order |
//! | `GET /orders/by-order/{order_id}` | `200` + list |
//! | `PUT /orders/{id}/status` | `200` + order |
//! | `POST /orders/{id}/cancel` | `200`, empty body |
//! | `DELETE /orders/{id}` | `204` |
//!
//! A body or path that does not deserialize is a `400` with a `body` or
//! `path` field error.

use crate::{
    error::KitchenError,
    extract::{Json, Path},
    lifecycle::KitchenOrderLifecycle,
    store::KitchenOrderStore,
};
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header::LOCATION},
    response::IntoResponse,
    routing::{get, post, put},
};
use galley_core::{
    KitchenStatus,
    wire::{CreateKitchenOrderRequest, KitchenOrderResponse, UpdateStatusRequest},
};
use std::sync::Arc;
use uuid::Uuid;

type Lifecycle<S> = State<Arc<KitchenOrderLifecycle<S>>>;

pub fn routes<S: KitchenOrderStore>() -> Router<Arc<KitchenOrderLifecycle<S>>> {
    Router::new()
        .route("/orders", post(create_order::<S>))
        .route(
            "/orders/{id}",
            get(get_order::<S>).delete(delete_order::<S>),
        )
        .route("/orders/by-order/{order_id}", get(list_by_order::<S>))
        .route("/orders/{id}/status", put(update_status::<S>))
        .route("/orders/{id}/cancel", post(cancel_order::<S>))
}

/// Parses a requested status, rejecting blanks and unknown values as
/// validation failures on the `status` field.
pub fn parse_status(raw: Option<&str>) -> Result<KitchenStatus, KitchenError> {
    match raw.map(str::trim) {
        None | Some("") => Err(KitchenError::invalid_field("status", "must not be blank")),
        Some(raw) => raw
            .parse()
            .map_err(|err: galley_core::UnknownStatus| {
                KitchenError::invalid_field("status", err.to_string())
            }),
    }
}

async fn create_order<S: KitchenOrderStore>(
    State(lifecycle): Lifecycle<S>,
    Json(body): Json<CreateKitchenOrderRequest>,
) -> Result<impl IntoResponse, KitchenError> {
    let source_order_id = body
        .source_order_id
        .ok_or_else(|| KitchenError::invalid_field("sourceOrderId", "must not be null"))?;
    let order = lifecycle.create(source_order_id, body.items_payload.unwrap_or_default())?;

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/orders/{}", order.id))],
        Json(KitchenOrderResponse::from(&order)),
    ))
}

async fn get_order<S: KitchenOrderStore>(
    State(lifecycle): Lifecycle<S>,
    Path(id): Path<Uuid>,
) -> Result<Json<KitchenOrderResponse>, KitchenError> {
    let order = lifecycle.find(id)?;
    Ok(Json(KitchenOrderResponse::from(&order)))
}

async fn list_by_order<S: KitchenOrderStore>(
    State(lifecycle): Lifecycle<S>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<KitchenOrderResponse>>, KitchenError> {
    let orders = lifecycle.find_by_order_id(order_id)?;
    Ok(Json(orders.iter().map(KitchenOrderResponse::from).collect()))
}

async fn update_status<S: KitchenOrderStore>(
    State(lifecycle): Lifecycle<S>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<KitchenOrderResponse>, KitchenError> {
    let status = parse_status(body.status.as_deref())?;
    let order = lifecycle.update_status(id, status)?;
    Ok(Json(KitchenOrderResponse::from(&order)))
}

async fn cancel_order<S: KitchenOrderStore>(
    State(lifecycle): Lifecycle<S>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, KitchenError> {
    lifecycle.cancel_order(id)?;
    Ok(StatusCode::OK)
}

async fn delete_order<S: KitchenOrderStore>(
    State(lifecycle): Lifecycle<S>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, KitchenError> {
    lifecycle.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_lenient_about_case_and_whitespace() {
        assert_eq!(
            parse_status(Some(" in_progress ")).unwrap(),
            KitchenStatus::InProgress
        );
        assert_eq!(parse_status(Some("READY")).unwrap(), KitchenStatus::Ready);
    }

    #[test]
    fn blank_or_unknown_status_is_a_validation_error() {
        for raw in [None, Some(""), Some("   "), Some("COOKING")] {
            match parse_status(raw) {
                Err(KitchenError::Validation(errors)) => {
                    assert!(errors.contains_key("status"), "{raw:?}")
                }
                other => panic!("{raw:?} gave {other:?}"),
            }
        }
    }
}
