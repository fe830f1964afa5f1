//! Coursework server - HTTP API entry point

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;

use coursework_server::{Config, create_app, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Err(e) = dotenvy::dotenv() {
        // Only warn if it's not a "file not found" error
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Load and validate configuration
    let config = Config::load().map_err(|e| {
        std::io::Error::other(format!(
            "Failed to load configuration. Check config/ and COURSEWORK__* env vars: {}",
            e
        ))
    })?;

    // Initialize tracing (after config is loaded so we can use logging config)
    init_tracing(&config.logging)?;

    tracing::info!("Starting coursework server...");
    tracing::info!(
        "Configuration loaded: server={}:{}",
        config.server.host,
        config.server.port
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    let app_handle = create_app(config).await.map_err(|e| {
        std::io::Error::other(format!("Failed to create application: {}", e))
    })?;
    let shutdown_token = app_handle.shutdown_token;

    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Peer addresses feed the anonymous rate-limit bucket
    let server = axum::serve(
        listener,
        app_handle
            .router
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_token.clone().cancelled_owned());

    tokio::select! {
        result = server.into_future() => result?,
        _ = drain_deadline(shutdown_token, shutdown_timeout) => {
            tracing::warn!("In-flight requests did not finish within the shutdown timeout");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves `timeout` after shutdown starts
async fn drain_deadline(shutdown_token: CancellationToken, timeout: Duration) {
    shutdown_token.cancelled().await;
    tokio::time::sleep(timeout).await;
}

/// Wait for Ctrl+C or SIGTERM and start the graceful shutdown
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }

    shutdown_token.cancel();
}
