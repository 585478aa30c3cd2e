//! # Telemetry
//!
//! Both services always log through `tracing` with a `fmt` layer filtered by
//! `RUST_LOG` (default `info`). OpenTelemetry export is opt-in:
//!
//! | feature | effect |
//! |---|---|
//! | `otel` | spans exported through `tracing-opentelemetry` |
//! | `metrics` | lifecycle counters and the prep-delay histogram |
//! | `stdout` | stdout exporter for whichever of the above is on |
//! | `otlp` | OTLP/gRPC exporter to `OTEL_EXPORTER_OTLP_ENDPOINT` |
//!
//! The `record_*` helpers are always callable; without `metrics` they do
//! nothing.
//!
//! ```bash
//! RUST_LOG=galley_kitchen=debug cargo run -p galley-kitchen --features otel,stdout
//! ```

#[cfg(all(
    any(feature = "stdout", feature = "otlp"),
    not(any(feature = "otel", feature = "metrics"))
))]
compile_error!("The `stdout` and `otlp` exporters need `otel` or `metrics` enabled.");

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "otel"))]
use opentelemetry_semantic_conventions as semvcns;
#[cfg(feature = "otlp")]
use {anyhow::Context, opentelemetry_otlp::WithExportConfig};

#[cfg(feature = "otel")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel")]
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "metrics", feature = "otel"))]
const EXPORT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
#[cfg(feature = "otlp")]
const EXPORT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Keeps the exporters alive; call [`shutdown`](Self::shutdown) after the
/// server stops so buffered data is sent.
pub struct TelemetryProviders {
    #[cfg(feature = "otel")]
    tracer: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    meter: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    pub fn shutdown(self) {
        // The subscriber may already be gone, hence stderr.
        #[cfg(feature = "otel")]
        if let Err(err) = self.tracer.shutdown() {
            eprintln!("Error shutting down tracer provider: {err}");
        }
        #[cfg(feature = "metrics")]
        if let Err(err) = self.meter.shutdown() {
            eprintln!("Error shutting down meter provider: {err}");
        }
    }
}

/// Installs the global subscriber for `service_name`. Call once, first thing
/// in `main`.
pub fn init_telemetry(service_name: &'static str) -> anyhow::Result<TelemetryProviders> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        );

    #[cfg(not(any(feature = "metrics", feature = "otel")))]
    let _ = service_name;

    #[cfg(any(feature = "metrics", feature = "otel"))]
    let scope = InstrumentationScope::builder(service_name)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    #[cfg(feature = "otel")]
    let (registry, tracer) = {
        let provider = tracer_provider(service_name)?;
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        opentelemetry::global::set_tracer_provider(provider.clone());
        let layer = tracing_opentelemetry::layer()
            .with_tracer(provider.tracer_with_scope(scope.clone()))
            .with_error_records_to_exceptions(true);
        (registry.with(layer), provider)
    };

    #[cfg(feature = "metrics")]
    let (registry, meter) = {
        let provider = meter_provider(service_name)?;
        opentelemetry::global::set_meter_provider(provider.clone());
        let _ = INSTRUMENTS.set(Instruments::new(&opentelemetry::global::meter_with_scope(scope)));
        let layer = tracing_opentelemetry::MetricsLayer::new(provider.clone());
        (registry.with(layer), provider)
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "otel")]
        tracer,
        #[cfg(feature = "metrics")]
        meter,
    })
}

#[cfg(any(feature = "metrics", feature = "otel"))]
fn resource(service_name: &'static str) -> Resource {
    Resource::builder()
        .with_service_name(service_name)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "otlp")]
fn otlp_endpoint() -> anyhow::Result<String> {
    std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").context("missing `OTEL_EXPORTER_OTLP_ENDPOINT`")
}

#[cfg(feature = "otel")]
fn tracer_provider(service_name: &'static str) -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource(service_name));

    #[cfg(feature = "stdout")]
    let builder = builder.with_span_processor(batched(opentelemetry_stdout::SpanExporter::default()));

    #[cfg(feature = "otlp")]
    let builder = builder.with_span_processor(batched(
        opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otlp_endpoint()?)
            .with_timeout(EXPORT_TIMEOUT)
            .build()
            .context("failed to build OTLP span exporter")?,
    ));

    Ok(builder.build())
}

#[cfg(feature = "otel")]
fn batched<E>(exporter: E) -> sdktrace::BatchSpanProcessor
where
    E: sdktrace::SpanExporter + Send + 'static,
{
    let config = sdktrace::BatchConfigBuilder::default()
        .with_scheduled_delay(EXPORT_INTERVAL)
        .with_max_queue_size(2048)
        .build();
    sdktrace::BatchSpanProcessor::builder(exporter)
        .with_batch_config(config)
        .build()
}

#[cfg(feature = "metrics")]
fn meter_provider(service_name: &'static str) -> anyhow::Result<sdkmetrics::SdkMeterProvider> {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource(service_name));

    #[cfg(feature = "stdout")]
    let builder = builder.with_reader(
        sdkmetrics::PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
            .with_interval(EXPORT_INTERVAL)
            .build(),
    );

    #[cfg(feature = "otlp")]
    let builder = builder.with_periodic_exporter(
        opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(otlp_endpoint()?)
            .with_timeout(EXPORT_TIMEOUT)
            .build()
            .context("failed to build OTLP metric exporter")?,
    );

    Ok(builder.build())
}

#[cfg(feature = "metrics")]
struct Instruments {
    orders_created: Counter<u64>,
    prep_delay: Histogram<f64>,
    completions: Counter<u64>,
    callbacks: Counter<u64>,
    forwarded: Counter<u64>,
}

#[cfg(feature = "metrics")]
static INSTRUMENTS: OnceLock<Instruments> = OnceLock::new();

#[cfg(feature = "metrics")]
impl Instruments {
    fn new(meter: &Meter) -> Self {
        Self {
            orders_created: meter
                .u64_counter("galley.kitchen.orders_created")
                .with_description("Kitchen orders accepted for preparation")
                .build(),
            prep_delay: meter
                .f64_histogram("galley.kitchen.prep_delay")
                .with_unit("s")
                .with_description("Randomized delay before an order is marked ready")
                .build(),
            completions: meter
                .u64_counter("galley.kitchen.completions")
                .with_description("Completion timer firings by outcome")
                .build(),
            callbacks: meter
                .u64_counter("galley.kitchen.callbacks")
                .with_description("Readiness pushes by outcome")
                .build(),
            forwarded: meter
                .u64_counter("galley.orders.forwarded")
                .with_description("Calls forwarded to the kitchen by operation and outcome")
                .build(),
        }
    }
}

#[cfg(feature = "metrics")]
fn with_instruments(record: impl FnOnce(&Instruments)) {
    if let Some(instruments) = INSTRUMENTS.get() {
        record(instruments);
    }
}

pub fn increment_kitchen_orders_created() {
    #[cfg(feature = "metrics")]
    with_instruments(|m| m.orders_created.add(1, &[]));
}

pub fn record_prep_delay(seconds: f64) {
    #[cfg(feature = "metrics")]
    with_instruments(|m| m.prep_delay.record(seconds, &[]));
    #[cfg(not(feature = "metrics"))]
    let _ = seconds;
}

pub fn record_completion(outcome: &'static str) {
    #[cfg(feature = "metrics")]
    with_instruments(|m| m.completions.add(1, &[KeyValue::new("outcome", outcome)]));
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

pub fn record_callback(outcome: &'static str) {
    #[cfg(feature = "metrics")]
    with_instruments(|m| m.callbacks.add(1, &[KeyValue::new("outcome", outcome)]));
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// `operation` is one of `create`, `update`, `cancel`.
pub fn record_forwarded(operation: &'static str, outcome: &'static str) {
    #[cfg(feature = "metrics")]
    with_instruments(|m| {
        m.forwarded.add(
            1,
            &[
                KeyValue::new("operation", operation),
                KeyValue::new("outcome", outcome),
            ],
        );
    });
    #[cfg(not(feature = "metrics"))]
    let _ = (operation, outcome);
}
