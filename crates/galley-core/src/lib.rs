//! # `galley-core`: shared contract between the kitchen and order services
//!
//! The kitchen service owns the lifecycle of a kitchen order; the order
//! service keeps a courtesy mirror of whatever the kitchen last reported. The
//! two sides only agree on what travels over HTTP, and this crate is where
//! that agreement lives.
//!
//! ## Module Overview
//!
//! - [`status`] - The kitchen-side status vocabulary ([`KitchenStatus`]).
//! - [`wire`] - JSON request/response bodies exchanged between services.
//! - [`error`] - The JSON error body every endpoint returns on failure.
//! - [`telemetry`] - `tracing` subscriber setup with optional OpenTelemetry
//!   export.
//! - [`shutdown`] - Ctrl+C / SIGTERM future used by both binaries.
//!
//! The order side deliberately keeps kitchen status as a raw string on the
//! wire ([`wire::KitchenOrderResponse::status`]) so that vocabulary drift on
//! the kitchen side never breaks deserialization on the order side.

pub mod error;
pub mod shutdown;
pub mod status;
pub mod telemetry;
pub mod wire;

pub use error::ErrorBody;
pub use status::{KitchenStatus, UnknownStatus};
