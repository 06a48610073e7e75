// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SpiderFoot fabric daemon (sfd)
//!
//! Background process that owns the event fabric and serves the HTTP
//! adapter. Configuration comes from the environment (see
//! [`sf_daemon::FabricConfig::from_env`]).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use sf_api::{ApiKeyAuth, AppState, TokenSigner, TracingConfig};
use sf_core::SystemClock;
use sf_daemon::{lifecycle, FabricConfig};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("sfd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("sfd {}", env!("CARGO_PKG_VERSION"));
                println!("SpiderFoot fabric daemon - event bus, tasks, alerts, webhooks");
                println!();
                println!("USAGE:");
                println!("    sfd");
                println!();
                println!("Configuration is environment-driven (SF_EVENTBUS_BACKEND,");
                println!("SF_EVENTBUS_REDIS_URL, SF_EVENTBUS_NATS_URL, SF_API_BIND, ...).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: sfd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = FabricConfig::from_env();
    let _log_guard = setup_logging(&config)?;

    info!("starting fabric daemon");

    let fabric = match lifecycle::startup(&config).await {
        Ok(fabric) => fabric,
        Err(e) => {
            error!("failed to start fabric: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState {
        bus: fabric.bus.clone(),
        tasks: fabric.tasks.clone(),
        limiter: fabric.limiter.clone(),
        alerts: fabric.alerts.clone(),
        notifications: fabric.notifications.clone(),
        reports: fabric.reports.clone(),
        auth: build_auth(&config),
        webhook_default_timeout: config.webhook_timeout,
    };
    let router = sf_api::router(state, TracingConfig::default());

    let listener = tokio::net::TcpListener::bind(&config.api_bind).await?;
    info!("api listening on {}", config.api_bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    lifecycle::shutdown(fabric).await;
    info!("daemon stopped");
    Ok(())
}

/// Request authenticator from the environment configuration: the
/// anonymous fallback role, RBAC enforcement, and — when a JWT secret is
/// set — signed bearer tokens with the configured lifetimes.
fn build_auth(config: &FabricConfig) -> ApiKeyAuth {
    let mut auth = ApiKeyAuth::new(config.rbac_enforce, config.default_api_key_role.clone());
    if config.jwt_secret.is_empty() {
        if config.rbac_enforce {
            warn!("RBAC enforcement is on with no JWT secret; only API keys can authenticate");
        }
    } else {
        auth = auth.with_token_signer(TokenSigner::new(
            config.jwt_secret.clone(),
            config.jwt_access_ttl,
            config.jwt_refresh_ttl,
            Arc::new(SystemClock),
        ));
    }
    auth
}

/// Resolves when SIGTERM or SIGINT arrives.
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("failed to install SIGTERM handler: {}", e);
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(sigint) => sigint,
        Err(e) => {
            error!("failed to install SIGINT handler: {}", e);
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `sfd.log` → `sfd.log.1` → `sfd.log.2` → `sfd.log.3`, deleting
/// the oldest. Best-effort: rotation failures never block startup.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

fn setup_logging(
    config: &FabricConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_file {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            rotate_log_if_needed(log_path);

            let dir = log_path
                .parent()
                .map(std::path::Path::to_path_buf)
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            let file_name = log_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| "sfd.log".to_string());
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            Ok(None)
        }
    }
}
