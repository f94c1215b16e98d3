use anyhow::Context;
use clap::Parser;
use reservation_desk::domain::ports::{Clock, SystemClock};
use reservation_desk::utils::{logger, validation::Validate};
use reservation_desk::{build_router, AppState, InMemoryStore, SeedData, ServerCli};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ServerCli::parse();
    let config = cli.load_config().context("failed to load configuration")?;

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(config.logging.verbose);
    } else {
        logger::init_cli_logger(config.logging.verbose);
    }

    tracing::info!("Starting reservation-desk");
    tracing::debug!("Server config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryStore::new(clock.clone()));

    if let Some(seed_path) = &config.store.seed_path {
        let seed = SeedData::from_file(seed_path)
            .await
            .with_context(|| format!("failed to load seed file {}", seed_path))?;
        let (reservations, tables) = store
            .seed(seed)
            .await
            .with_context(|| format!("failed to seed the store from {}", seed_path))?;
        tracing::info!(
            "🌱 Seeded {} reservations and {} tables from {}",
            reservations,
            tables,
            seed_path
        );
    }

    let router = build_router(AppState::in_memory(store, clock));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!("🚀 Listening on http://{}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
