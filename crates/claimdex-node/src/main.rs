//! Claimdex pipeline service entry point.

use claimdex_scanners::{run_scanner_loop, Config, ServiceRegistry};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "claimdex=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("initializing Claimdex pipeline...");

    let registry = ServiceRegistry::build(config).await?;
    let config = &registry.config;

    let mut handles = Vec::new();

    let scanner = registry.network_scanner.clone();
    handles.push(tokio::spawn(run_scanner_loop(
        "NetworkScanner",
        config.network_scan_interval,
        move || {
            let scanner = scanner.clone();
            async move { scanner.run().await }
        },
    )));

    let scanner = registry.block_scanner.clone();
    handles.push(tokio::spawn(run_scanner_loop(
        "BlockScanner",
        config.block_scanner.run_interval,
        move || {
            let scanner = scanner.clone();
            async move { scanner.run().await }
        },
    )));

    let scanner = registry.transaction_scanner.clone();
    handles.push(tokio::spawn(run_scanner_loop(
        "TransactionScanner",
        config.transaction_scanner.run_interval,
        move || {
            let scanner = scanner.clone();
            async move { scanner.run().await }
        },
    )));

    let scanner = registry.source_scanner.clone();
    handles.push(tokio::spawn(run_scanner_loop(
        "SourceScanner",
        config.source_scanner.run_interval,
        move || {
            let scanner = scanner.clone();
            async move { scanner.run().await }
        },
    )));

    let scanner = registry.date_scanner.clone();
    handles.push(tokio::spawn(run_scanner_loop(
        "DateScanner",
        config.date_scanner.run_interval,
        move || {
            let scanner = scanner.clone();
            async move { scanner.run().await }
        },
    )));

    let scanner = registry.token_scanner.clone();
    handles.push(tokio::spawn(run_scanner_loop(
        "TokenScanner",
        config.token_scanner.run_interval,
        move || {
            let scanner = scanner.clone();
            async move { scanner.run().await }
        },
    )));

    info!("all scanner loops started");

    // Interrupt or terminate cancels every loop; in-flight batches roll
    // back when their transactions drop.
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }

    info!("initiating graceful shutdown...");
    for handle in &handles {
        handle.abort();
    }
    info!("shutdown complete");
    Ok(())
}
