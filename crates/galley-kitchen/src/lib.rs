#![doc = include_str!("../README.md")]

pub mod api;
pub mod callback;
pub mod config;
pub mod error;
pub mod extract;
pub mod lifecycle;
pub mod model;
pub mod schedule;
pub mod store;
pub mod transition;

#[cfg(test)]
mod tests;

use axum::Router;
use lifecycle::KitchenOrderLifecycle;
use std::sync::Arc;
use store::KitchenOrderStore;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Builds the kitchen service router with request tracing and permissive
/// CORS.
pub fn app<S: KitchenOrderStore>(lifecycle: Arc<KitchenOrderLifecycle<S>>) -> Router {
    api::routes::<S>().with_state(lifecycle).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
    )
}
