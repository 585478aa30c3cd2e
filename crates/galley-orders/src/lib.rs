#![doc = include_str!("../README.md")]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod translate;


use api::AppState;
use axum::Router;
use store::OrderStore;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Builds the order service router with request tracing and permissive CORS.
pub fn app<S: OrderStore>(state: AppState<S>) -> Router {
    api::routes::<S>().with_state(state).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
    )
}
