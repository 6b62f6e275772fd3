pub mod api;
pub mod background;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod state;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use crate::api::router::create_router;
use crate::background::start_background_worker;
use crate::config::Config;
use crate::infra::factory::bootstrap_state;
use crate::state::AppState;

/// The JSON file keeps engine debug events (claims, supersession, derived-state failures)
/// even when the console is turned down through `RUST_LOG`.
const FILE_FILTER: &str = "info,rental_backend=debug,sqlx=warn";
const CONSOLE_DEFAULT_FILTER: &str = "info,sqlx=warn";

pub fn init_logging(log_dir: &str) -> WorkerGuard {
    let (file_writer, guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::daily(log_dir, "rental-backend.log"),
    );

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new(FILE_FILTER));

    let console_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| CONSOLE_DEFAULT_FILTER.into()));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(log_dir, "Logging initialized");
    guard
}

fn spawn_scheduler_driver(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(start_background_worker(state))
}

pub async fn run() {
    let config = Config::from_env();
    let _guard = init_logging(&config.log_dir);

    let state = Arc::new(bootstrap_state(&config).await);
    let _driver = spawn_scheduler_driver(state.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("Failed to bind HTTP listener");
    info!(port = config.port, database = config.backend_name(), "Rental backend listening");

    axum::serve(listener, create_router(state)).await.expect("HTTP server error");
}
