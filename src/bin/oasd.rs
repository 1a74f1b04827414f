//! OAuth 2.1 authorization server binary.
//!
//! Loads configuration from the environment, seeds registered clients, and
//! starts the HTTP server with graceful shutdown.

use std::{env, sync::Arc};

use anyhow::Result;
use oasd::{
    config::Config,
    errors::ConfigError,
    http::{AppState, build_router},
    oauth::{AuthorizationServer, types::Client},
    storage::{OAuthStorage, create_storage_backend, parse_storage_backend},
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "oasd=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    let version = oasd::config::version()?;

    env::args().for_each(|arg| {
        if arg == "--version" {
            println!("{version}");
            std::process::exit(0);
        }
    });

    tracing::info!(?version, "Starting oasd");

    let config = Config::new()?;

    let storage_backend = parse_storage_backend(&config.storage_backend)?;
    let storage = create_storage_backend(storage_backend);

    if let Some(seed_path) = &config.client_seed_path {
        seed_clients(storage.clone(), seed_path).await?;
    }

    let auth_server = Arc::new(AuthorizationServer::new(
        storage.clone(),
        config.external_base.to_string(),
        *config.auth_request_ttl.as_ref(),
        *config.auth_code_ttl.as_ref(),
    ));

    let app_context = AppState {
        config: Arc::new(config.clone()),
        storage,
        auth_server,
    };

    let app = build_router(app_context);

    // Setup graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    {
        let tracker = tracker.clone();
        let inner_token = token.clone();

        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::spawn(async move {
            tokio::select! {
                () = inner_token.cancelled() => { },
                _ = terminate => {},
                _ = ctrl_c => {},
            }

            tracker.close();
            inner_token.cancel();
        });
    }

    // Start HTTP server
    {
        let http_port = *config.http_port.as_ref();
        let inner_token = token.clone();
        tracker.spawn(async move {
            let bind_address = format!("0.0.0.0:{http_port}");
            tracing::info!("Starting server on {bind_address}");
            let listener = match TcpListener::bind(&bind_address).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind {bind_address}: {err}");
                    inner_token.cancel();
                    return;
                }
            };

            let shutdown_token = inner_token.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_token.cancelled().await;
                    tracing::info!("axum graceful shutdown complete");
                })
                .await;
            if let Err(err) = result {
                tracing::error!("axum task failed: {}", err);
            }

            inner_token.cancel();
        });
    }

    tracker.wait().await;

    Ok(())
}

/// Load client records from a JSON seed file and register them.
async fn seed_clients(storage: Arc<dyn OAuthStorage>, seed_path: &str) -> Result<()> {
    let raw = tokio::fs::read_to_string(seed_path)
        .await
        .map_err(|e| ConfigError::ClientSeedFailed(seed_path.to_string(), e.to_string()))?;
    let clients: Vec<Client> = serde_json::from_str(&raw)
        .map_err(|e| ConfigError::ClientSeedFailed(seed_path.to_string(), e.to_string()))?;

    for client in &clients {
        if client.redirect_uris.is_empty() {
            return Err(ConfigError::ClientSeedFailed(
                seed_path.to_string(),
                format!(
                    "client `{}` must register at least one redirect URI",
                    client.client_id
                ),
            )
            .into());
        }
        for uri in &client.redirect_uris {
            oasd::oauth::redirect_uri::validate_redirect_uri(uri).map_err(|e| {
                ConfigError::ClientSeedFailed(seed_path.to_string(), e.to_string())
            })?;
        }
        storage.store_client(client).await?;
    }

    tracing::info!(count = clients.len(), "seeded clients from {seed_path}");
    Ok(())
}
