//! Clinic HTTP server entry point.
//!
//! # Responsibility
//! - Read configuration, start logging, open and migrate the database.
//! - Serve the API until Ctrl-C, then drain in-flight requests.

mod config;

use clinic_api::{build_router, AppState};
use clinic_core::db::open_db;
use config::ServerConfig;
use log::{error, info, warn};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let logging = match config.log_dir.as_deref() {
        Some(dir) => clinic_core::init_logging(&config.log_level, dir),
        None => clinic_core::init_stderr_logging(&config.log_level),
    };
    if let Err(err) = logging {
        eprintln!("logging setup failed: {err}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_exit module=server status=error error={err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), String> {
    let conn = open_db(&config.db_path)
        .map_err(|err| format!("open `{}`: {err}", config.db_path.display()))?;
    let state = AppState::new(conn).with_consultation_fee(config.consultation_fee);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|err| format!("bind {}: {err}", config.bind_addr))?;
    info!(
        "event=server_start module=server status=ok addr={} db={} version={}",
        config.bind_addr,
        config.db_path.display(),
        clinic_core::core_version()
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| format!("serve: {err}"))?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=server_signal module=server status=error error={err}");
    }
}
