//! Tradewind webhook & API credential service.
//!
//! Hosts the tenant-facing HTTP API and the background delivery worker over
//! one PostgreSQL pool. Built with Axum.

mod config;
mod health;
mod logging;
mod openapi;

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use config::Config;
use health::{health_handler, livez_handler, readyz_handler};
use openapi::openapi_routes;
use tradewind_webhooks::services::delivery_service::DeliveryService;
use tradewind_webhooks::{webhooks_router, EventPublisher, WebhookWorker, WebhooksState};

/// Capacity of the publish-notification channel feeding the worker.
const NOTIFY_CHANNEL_CAPACITY: usize = 256;

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
        "Starting webhook-api"
    );

    // Database pool + migrations
    let pool = match tradewind_db::connect_pool(&config.database_url, config.db_max_connections)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = tradewind_db::run_migrations(&pool).await {
        tracing::error!("Failed to run migrations: {e}");
        std::process::exit(1);
    }

    // Services shared between the API and the delivery worker
    let delivery_service =
        match DeliveryService::new(pool.clone(), config.webhook_encryption_key.to_vec()) {
            Ok(service) => service,
            Err(e) => {
                tracing::error!("Failed to create delivery service: {e}");
                std::process::exit(1);
            }
        };
    let (publisher, notify_rx) = EventPublisher::new(pool.clone(), NOTIFY_CHANNEL_CAPACITY);

    let webhooks_state = WebhooksState::new(
        pool.clone(),
        config.webhook_encryption_key.to_vec(),
        publisher,
        delivery_service.clone(),
    )
    .with_allow_http(config.allow_http_endpoints);

    // Delivery worker with cooperative shutdown
    let shutdown_token = CancellationToken::new();
    {
        let worker = WebhookWorker::new(delivery_service, notify_rx, shutdown_token.clone());
        tokio::spawn(async move {
            worker.run().await;
        });
        info!("Delivery worker started");
    }

    // Router: subsystem routes + health + OpenAPI document
    let app = Router::new()
        .merge(webhooks_router(webhooks_state))
        .merge(openapi_routes())
        .route("/health", get(health_handler))
        .route("/livez", get(livez_handler))
        .route("/readyz", get(readyz_handler).with_state(pool.clone()))
        .layer(TraceLayer::new_for_http());

    let addr = match format!("{}:{}", config.host, config.port).parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address: {e}");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!(%addr, "Listening");

    let server_token = shutdown_token.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            server_token.cancel();
        })
        .await;

    // Make sure the worker stops even if the server errored out.
    shutdown_token.cancel();

    if let Err(e) = result {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    info!("Shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
