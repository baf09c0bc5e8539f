mod analysis;
mod config;
mod errors;
mod extraction;
mod job_posting;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::session::SessionStore;
use crate::config::Config;
use crate::job_posting::JobPostingFetcher;
use crate::llm_client::{GeminiBackend, GenerationClient};
use crate::routes::build_router;
use crate::state::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Matcher API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize generation backend
    let backend = GeminiBackend::new(
        &config.gemini_api_base,
        &config.gemini_model,
        config.google_api_key.clone(),
    )?;
    info!("Generation backend initialized (model: {})", config.gemini_model);
    let generator = GenerationClient::new(Arc::new(backend));

    let job_fetcher = JobPostingFetcher::new(Duration::from_secs(config.job_fetch_timeout_secs))?;

    let sessions = SessionStore::with_limits(
        Duration::from_secs(config.session_ttl_secs),
        config.max_sessions,
    );
    spawn_session_sweeper(sessions.clone());

    // Build app state
    let state = AppState {
        generator,
        job_fetcher: Arc::new(job_fetcher),
        sessions,
    };

    // Build router
    let app = build_router(state, config.max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drops idle sessions so the in-memory store stays bounded.
fn spawn_session_sweeper(sessions: SessionStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = sessions.evict_expired(Utc::now()).await;
            if evicted > 0 {
                debug!("Evicted {evicted} idle sessions");
            }
        }
    });
}
