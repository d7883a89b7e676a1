//! Startup ideas HTTP server binary.
//!
//! Starts an axum HTTP server exposing the idea generation and validation
//! endpoints.
//!
//! # Environment Variables
//!
//! - `HOST` / `PORT` — bind address (default: 0.0.0.0:8000)
//! - `OPENAI_API_KEY` — required for the crew endpoints
//! - `RUST_LOG` — Tracing filter (default: "info,startup_ideas=debug")
//!
//! See [`startup_ideas::utilities::config`] for the full list.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::sync::Arc;

use anyhow::Context;
use startup_ideas::llm::SettingsLlmFactory;
use startup_ideas::server::{app_router, AppState};
use startup_ideas::utilities::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,startup_ideas=debug".into()),
        )
        .init();

    if settings.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; crew endpoints will fail until it is");
    }

    let bind_addr = settings.bind_addr();
    let factory = Arc::new(SettingsLlmFactory::new(settings.clone()));
    let state = AppState::new(settings, factory).context("Failed to load crew configuration")?;
    let app = app_router(state);

    tracing::info!("startup-ideas server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /               — welcome message");
    tracing::info!("  GET  /health         — liveness probe");
    tracing::info!("  POST /generate-ideas — idea generation crew");
    tracing::info!("  POST /validate-idea  — idea validation crew");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    tracing::info!("startup-ideas server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
