//! hookrelay API server.
//!
//! Ingests third-party webhook calls on behalf of tenant applications,
//! persists them, and delivers each to its configured target URL with
//! bounded exponential retry. Runs the HTTP API and the delivery workers
//! in one process, sharing the durable Postgres-backed queue.

mod config;
mod health;
mod logging;
mod openapi;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use config::Config;
use health::health_handler;
use hookrelay_db::{run_migrations, DbPool};
use hookrelay_delivery::services::delivery_service::DeliveryService;
use hookrelay_delivery::{
    relay_router, DeliveryWorker, PgDeliveryQueue, RelayState, RetryPolicy,
};
use openapi::openapi_routes;

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values)
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        env = %config.app_env,
        "Starting hookrelay API"
    );

    match config.validate_security_config() {
        Ok(warnings) => {
            for warning in &warnings {
                tracing::warn!(target: "security", "{}", warning);
            }
        }
        Err(errors) => {
            for error in &errors {
                tracing::error!(target: "security", "{}", error);
            }
            eprintln!(
                "FATAL: {} insecure setting(s) detected in production mode. \
                 Fix the configuration or use APP_ENV=development.",
                errors.len()
            );
            std::process::exit(1);
        }
    }

    // Create database connection pool
    let db = match DbPool::connect(&config.database_url).await {
        Ok(db) => {
            info!("Database connection established");
            db
        }
        Err(e) => {
            eprintln!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(&db).await {
        eprintln!("FATAL: Database migration failed: {e}");
        std::process::exit(1);
    }

    let pool = db.inner().clone();

    // The durable queue and retry policy are constructed once here and
    // injected into everything that needs them.
    let queue = Arc::new(PgDeliveryQueue::new(pool.clone()));
    let policy = RetryPolicy {
        max_attempts: config.delivery.max_attempts,
        backoff_base_secs: config.delivery.backoff_base_secs,
    };

    let delivery_service = match DeliveryService::new(
        pool.clone(),
        Duration::from_secs(config.delivery.timeout_secs),
    ) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create delivery service: {e}");
            std::process::exit(1);
        }
    };

    let relay_state = RelayState::new(
        pool.clone(),
        queue.clone(),
        policy,
        config.allow_http_targets,
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(openapi_routes())
        .merge(relay_router(relay_state))
        .layer(cors);

    // Start delivery workers sharing the queue. Lease claims are atomic,
    // so the loops never step on each other.
    let worker_token = CancellationToken::new();
    for _ in 0..config.worker.concurrency {
        let worker = DeliveryWorker::new(delivery_service.clone(), queue.clone())
            .with_poll_interval(Duration::from_secs(config.worker.poll_interval_secs))
            .with_lease(Duration::from_secs(config.worker.lease_secs));
        let token = worker_token.clone();
        tokio::spawn(async move {
            worker.run(token).await;
        });
    }
    info!(
        concurrency = config.worker.concurrency,
        "Delivery workers started"
    );

    // Bind and serve
    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    info!(%addr, "Server listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    // Stop the workers; any task they were holding is redelivered once its
    // lease expires.
    worker_token.cancel();
    info!("Server shutdown complete");
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                // Fall through - we still want to wait for terminate signal
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
