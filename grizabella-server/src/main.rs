use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use grizabella_core::config::{ConfigBuilder, DB_PATH_ENV_VAR};
use grizabella_core::db_manager::GrizabellaDb;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

mod api;
mod cli;
mod error;
mod state;

use crate::cli::CliArgs;
use crate::state::AppState;

const DEFAULT_PORT: u16 = 8787;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Initialization failures are fatal: exit code 1 per spec §6.
            eprintln!("grizabella-server: fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> grizabella_core::error::Result<()> {
    let cli_args = CliArgs::parse();

    let logging_config = grizabella_core::config::LoggingConfig::default();
    if let Err(e) = grizabella_core::logging::init(&logging_config) {
        eprintln!("grizabella-server: warning: failed to initialize structured logging: {e:?}");
    }

    info!(version = grizabella_core::VERSION, "starting grizabella-server");

    let mut builder = ConfigBuilder::new().with_db_path_from_env();
    if let Some(path) = &cli_args.db_path {
        info!(path = %path.display(), "overriding database path from --db-path");
        builder = builder.with_data_dir(path.to_string_lossy().to_string());
    } else if std::env::var(DB_PATH_ENV_VAR).is_err() {
        info!("no --db-path or {} set, using per-user default database path", DB_PATH_ENV_VAR);
    }
    let config = builder.build()?;

    let db_path = config.storage.data_dir.to_string_lossy().to_string();
    let db_name_or_path = if db_path.is_empty() { "grizabella" } else { db_path.as_str() };
    let db = GrizabellaDb::connect_with_config(db_name_or_path, true, &config).await?;
    info!(paths = ?db.paths(), "database opened");

    let state = AppState::new(Arc::new(db));

    let app = crate::api::router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| grizabella_core::error::GrizabellaError::Configuration(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "grizabella-server listening");

    serve_with_shutdown(listener, app).await;

    info!("grizabella-server shutting down");
    match Arc::try_unwrap(state.db) {
        Ok(db) => db.close().await,
        Err(_) => error!("database handle still shared at shutdown, skipping explicit close"),
    }

    Ok(())
}

async fn serve_with_shutdown(listener: TcpListener, app: axum::Router) {
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        error!(error = %e, "server exited with error");
    }
}
