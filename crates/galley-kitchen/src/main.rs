use clap::Parser;
use galley_core::{shutdown::shutdown_signal, telemetry::init_telemetry};
use galley_kitchen::{
    callback::CallbackNotifier,
    config::{CliArgs, KitchenConfig},
    lifecycle::KitchenOrderLifecycle,
    schedule::CompletionScheduler,
    store::InMemoryKitchenOrderStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = KitchenConfig::try_from(args)?;

    let providers = init_telemetry("galley-kitchen")?;

    let scheduler = Arc::new(CompletionScheduler::dedicated(config.scheduler_workers)?);
    let notifier = config
        .callback
        .clone()
        .map(CallbackNotifier::new)
        .transpose()?;
    let lifecycle = Arc::new(KitchenOrderLifecycle::new(
        Arc::new(InMemoryKitchenOrderStore::new()),
        scheduler,
        notifier,
        config.prep,
    ));

    let listener = TcpListener::bind(&config.server_addr).await?;
    log_startup_info(&config);

    axum::serve(listener, galley_kitchen::app(Arc::clone(&lifecycle)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    lifecycle.shutdown().await;
    tracing::info!("Service shut down successfully");
    providers.shutdown();
    Ok(())
}

fn log_startup_info(config: &KitchenConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting kitchen service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            addr = %config.server_addr,
            workers = config.scheduler_workers,
            prep_enabled = config.prep.enabled,
            callback = config.callback.is_some(),
            "Starting kitchen service"
        );
    }
}
