mod cli;
mod config;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource};
use gateway_front::{create_router, GatewayState};

use crate::cli::Cli;
use crate::config::ConfigSource;

/// How long to wait for the audit writer to drain on shutdown.
const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args and environment.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let (mut cfg, source) = config::load(&cli.config)?;
    cfg.apply_cli(&cli);

    // 3. Init tracing-subscriber with JSON format.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    if source == ConfigSource::Defaults {
        warn!(
            path = %cli.config.display(),
            "configuration file not found; using defaults"
        );
    }

    let gateway_config = cfg.gateway_config().context("invalid configuration")?;

    info!(
        config_file = %cli.config.display(),
        host = %cfg.network.host,
        port = cfg.network.port,
        rpc_url = %gateway_config.rpc_url,
        ws_url = %gateway_config.ws_url,
        allowed_origins = ?gateway_config.allowlist.to_sorted_vec(),
        "ledger-gateway starting"
    );

    // 4. Start audit logger.
    let (audit, audit_handle) = match cfg.audit_log_path() {
        Some(path) => {
            let (sink, handle) = AuditSink::start(&path)
                .await
                .with_context(|| format!("failed to start audit logger at {}", path.display()))?;
            (sink, Some(handle))
        }
        None => {
            warn!("audit log disabled");
            (AuditSink::disabled(), None)
        }
    };

    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStarted,
            AuditSource::new("ledger-gateway"),
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "config_file": cli.config.display().to_string(),
            }),
        ))
        .await;

    // 5. Build shared state and bind.
    let state = GatewayState::new(gateway_config, audit.clone())
        .context("failed to build upstream HTTP client")?;

    let listener = tokio::net::TcpListener::bind((cfg.network.host.as_str(), cfg.network.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", cfg.network.host, cfg.network.port))?;
    let local_addr = listener.local_addr().context("failed to read bound address")?;

    info!(listen = %local_addr, "gateway listening");

    // 6. Serve until ctrl-c or SIGTERM.
    let result = axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    // 7. Log shutdown and let the audit writer drain.
    info!("ledger-gateway shutting down");

    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStopped,
            AuditSource::new("ledger-gateway"),
            serde_json::json!({
                "result": format!("{:?}", result),
            }),
        ))
        .await;
    drop(audit);

    if let Some(handle) = audit_handle {
        if tokio::time::timeout(AUDIT_DRAIN_TIMEOUT, handle).await.is_err() {
            warn!("audit writer still busy at exit; open bridges hold the sink");
        }
    }

    result.context("server error")?;
    Ok(())
}

/// Resolve on SIGINT (ctrl-c) or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT (ctrl-c)"),
        _ = terminate => info!("received SIGTERM"),
    }
}
