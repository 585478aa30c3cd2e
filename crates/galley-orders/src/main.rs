use clap::Parser;
use galley_core::{shutdown::shutdown_signal, telemetry::init_telemetry};
use galley_orders::{
    api::AppState,
    client::KitchenRpcClient,
    config::{CliArgs, OrdersConfig},
    reconcile::Reconciler,
    store::InMemoryOrderStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = OrdersConfig::try_from(args)?;

    let providers = init_telemetry("galley-orders")?;

    let kitchen = KitchenRpcClient::new(&config.kitchen_url, config.kitchen_timeout)?;
    let state = AppState {
        reconciler: Arc::new(Reconciler::new(Arc::new(InMemoryOrderStore::new()), kitchen)),
        callback_secret: config.callback_secret.clone(),
    };

    let listener = TcpListener::bind(&config.server_addr).await?;
    log_startup_info(&config);

    axum::serve(listener, galley_orders::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shut down successfully");
    providers.shutdown();
    Ok(())
}

fn log_startup_info(config: &OrdersConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting order service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            addr = %config.server_addr,
            kitchen_url = %config.kitchen_url,
            verify_callbacks = config.callback_secret.is_some(),
            "Starting order service"
        );
    }
}
