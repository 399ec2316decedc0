// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # bikechain Node
//!
//! Entry point for the `bikechain-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the world state, and serves the
//! HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`: serve the REST / JSON-RPC API and the metrics endpoint
//! - `init`: write the sample bikes into the world state
//! - `list`: print every record in the world state as JSON
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;

use bikechain_contracts::seed::init_ledger;
use bikechain_contracts::AssetLedger;
use bikechain_protocol::storage::SledStore;

use cli::{BikechainCli, Commands};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = BikechainCli::parse();
    let format = LogFormat::from_str_lossy(&cli.log_format);

    match cli.command {
        Commands::Run(args) => run_node(args, format).await,
        Commands::Init(args) => init_store(args, format),
        Commands::List(args) => list_store(args, format),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Opens (creating if needed) the sled store under `<data_dir>/db`.
fn open_store(data_dir: &Path) -> Result<SledStore> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let store = SledStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), records = store.len(), "database opened");
    Ok(store)
}

/// Serves the API and metrics until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs, format: LogFormat) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, format);

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.store.data_dir.display(),
        "starting bikechain-node"
    );

    // --- Persistent storage ---
    let ledger = Arc::new(AssetLedger::new(open_store(&args.store.data_dir)?));

    if args.seed {
        api::initialize_ledger(ledger.as_ref()).context("failed to seed the world state")?;
    }

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            bikechain_protocol::config::PROTOCOL_VERSION,
        ),
        ledger: Arc::clone(&ledger),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received, draining connections");
        let _ = shutdown_tx.send(true);
    });

    let (api_result, metrics_result) = tokio::join!(
        serve_until(api_listener, api_router, shutdown_rx.clone()),
        serve_until(metrics_listener, metrics_router, shutdown_rx),
    );
    if let Err(e) = api_result {
        tracing::error!("API server error: {}", e);
    }
    if let Err(e) = metrics_result {
        tracing::error!("Metrics server error: {}", e);
    }

    ledger
        .store()
        .flush()
        .context("failed to flush the world state")?;
    tracing::info!("bikechain-node stopped");
    Ok(())
}

/// Serves `router` until `shutdown` turns true, then stops accepting and
/// waits for in-flight requests to finish.
async fn serve_until(
    listener: TcpListener,
    router: axum::Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
}

/// Writes the sample bikes, replacing any records already at their IDs.
fn init_store(args: cli::StoreArgs, format: LogFormat) -> Result<()> {
    logging::init_logging("bikechain_node=info,bikechain_contracts=info", format);

    let data_dir = &args.data_dir;
    let ledger = AssetLedger::new(open_store(data_dir)?);
    let count = init_ledger(&ledger).context("failed to write the sample bikes")?;
    ledger
        .store()
        .flush()
        .context("failed to flush the world state")?;

    println!("Ledger initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Assets written : {}", count);
    println!("  Total records  : {}", ledger.store().len());

    Ok(())
}

/// Prints the full listing as pretty JSON on stdout. Logs go to stderr.
fn list_store(args: cli::StoreArgs, format: LogFormat) -> Result<()> {
    logging::init_logging("bikechain_node=warn,bikechain_contracts=warn", format);

    let ledger = AssetLedger::new(open_store(&args.data_dir)?);
    let entries = ledger.list_all().context("failed to list the world state")?;
    let json = serde_json::to_string_pretty(&entries).context("failed to encode the listing")?;
    println!("{}", json);

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("bikechain-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", bikechain_protocol::config::PROTOCOL_VERSION);
    println!("doc type       {}", bikechain_protocol::config::DOC_TYPE);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn serve_until_drains_in_flight_requests() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let entered = Arc::new(Notify::new());
        let handler_entered = Arc::clone(&entered);
        let router = axum::Router::new().route(
            "/slow",
            axum::routing::get(move || {
                let entered = Arc::clone(&handler_entered);
                async move {
                    entered.notify_one();
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "done"
                }
            }),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(serve_until(listener, router, shutdown_rx));

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut response = Vec::new();
            stream.read_to_end(&mut response).await.unwrap();
            String::from_utf8_lossy(&response).into_owned()
        });

        // Shut down while the request is still being handled.
        entered.notified().await;
        shutdown_tx.send(true).unwrap();

        let response = tokio::time::timeout(Duration::from_secs(5), client)
            .await
            .expect("client finished")
            .unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("done"));

        let served = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server stopped")
            .unwrap();
        assert!(served.is_ok());
    }
}
