use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;

use mohawk_rs::alerts::dispatch::NotificationDispatcher;
use mohawk_rs::alerts::rule::AlertRule;
use mohawk_rs::alerts::{AlertScheduler, AlertsHandle};
use mohawk_rs::cli;
use mohawk_rs::config::CoreConfig;
use mohawk_rs::routes;
use mohawk_rs::state::AppState;
use mohawk_rs::storage::document::DocumentEngine;
use mohawk_rs::storage::memory::MemoryEngine;
use mohawk_rs::storage::sqlite::SqliteEngine;
use mohawk_rs::storage::StorageEngine;

/// Parse an `options` string of `key=value&key=value` pairs (spec §6
/// "options" is engine-specific and format-free; this crate's engines use
/// the same shape as a URL query string for it).
fn parse_options(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

async fn open_storage(config: &CoreConfig) -> Result<Arc<dyn StorageEngine>> {
    let options = parse_options(&config.options);
    let engine: Arc<dyn StorageEngine> = match config.storage.as_str() {
        "memory" => Arc::new(MemoryEngine::new()),
        "sqlite" => {
            let url = options
                .get("url")
                .cloned()
                .unwrap_or_else(|| "sqlite://mohawk.db".to_string());
            Arc::new(SqliteEngine::open(&url).await.context("opening sqlite storage engine")?)
        }
        "document" => {
            let dir = options
                .get("dir")
                .cloned()
                .unwrap_or_else(|| "./mohawk-data".to_string());
            Arc::new(
                DocumentEngine::open(dir)
                    .await
                    .context("opening document storage engine")?,
            )
        }
        other => anyhow::bail!("unknown storage engine: {other}"),
    };
    Ok(engine)
}

/// Bind the HTTP listener, reporting an actionable message when the port is
/// already taken rather than the bare OS error.
async fn bind_listener(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "failed to bind mohawk-rs listener on {addr}: port already in use. Stop the other service using this port or re-run with --port to choose another port.",
            );
        }
        Err(err) => Err(err).with_context(|| format!("failed to bind mohawk-rs listener on {addr}")),
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if args.verbose {
                    tracing_subscriber::EnvFilter::new("debug")
                } else {
                    tracing_subscriber::EnvFilter::new("info")
                }
            }),
        )
        .init();

    let config = CoreConfig::load(&args).context("loading configuration")?;
    let storage = open_storage(&config).await?;
    tracing::info!(engine = storage.name(), "storage engine ready");

    let cancel = CancellationToken::new();

    let alerts_handle = if config.alerts.is_empty() {
        AlertsHandle::disabled()
    } else {
        let rules: Vec<AlertRule> = config
            .alerts
            .iter()
            .cloned()
            .map(|rule_config| AlertRule::from_config(rule_config, &config.default_tenant))
            .collect();
        let dispatcher = NotificationDispatcher::new(
            config.alerts_server.clone(),
            &config.alerts_server_method,
            config.alerts_server_insecure,
        );
        let scheduler = AlertScheduler::new(
            storage.clone(),
            rules,
            dispatcher,
            Duration::from_secs(config.alerts_interval_secs),
            config.alerts_server.clone(),
        );
        let handle = scheduler.handle();
        scheduler.start(cancel.clone());
        tracing::info!(
            rules = config.alerts.len(),
            interval_secs = config.alerts_interval_secs,
            "alert scheduler started"
        );
        handle
    };

    let gzip = config.gzip;
    let state = AppState::new(storage, alerts_handle, &config);
    let app = routes::router(state);
    let app = if gzip {
        app.layer(CompressionLayer::new())
    } else {
        app
    };

    if config.tls {
        tracing::warn!("tls=true is accepted for compatibility but TLS termination is not implemented; serving plain HTTP");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = bind_listener(&addr).await?;
    tracing::info!(%addr, "mohawk-rs listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("HTTP server error")?;

    cancel.cancel();
    Ok(())
}
