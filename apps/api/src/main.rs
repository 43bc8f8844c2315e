mod analysis;
mod cache;
mod config;
mod errors;
mod health;
mod llm_client;
mod models;
mod routes;
mod sources;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::events::TracingObserver;
use crate::analysis::extractor::LlmSkillExtractor;
use crate::analysis::service::AnalysisService;
use crate::cache::ResultCache;
use crate::config::Config;
use crate::health::HealthTracker;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::sources::france_travail::{FranceTravailClient, FranceTravailConfig};
use crate::state::AppState;

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

    info!("Starting SkillScope API v{}", env!("CARGO_PKG_VERSION"));

    // Job-posting source
    let source = FranceTravailClient::new(FranceTravailConfig::new(
        config.france_travail_client_id.clone(),
        config.france_travail_client_secret.clone(),
    ));
    info!("France Travail client initialized");

    // Extraction service. A missing key is reported per run and on the status route.
    let llm = match &config.anthropic_api_key {
        Some(key) => {
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(LlmClient::new(key.clone()).with_max_attempts(config.llm_max_attempts))
        }
        None => {
            warn!("ANTHROPIC_API_KEY is not set; analyses will fail until it is configured");
            None
        }
    };
    let extractor = LlmSkillExtractor::new(
        llm,
        &config.extraction_prompt_path,
        &config.consolidation_prompt_path,
    );

    // Result cache, with an optional background sweep of expired entries
    let cache = Arc::new(ResultCache::new());
    if let Some(every) = config.cache_sweep_interval {
        cache.clone().spawn_sweeper(every);
        info!("Cache sweeper running every {}s", every.as_secs());
    }

    let health = Arc::new(HealthTracker::new(config.health.clone()));

    let analysis = AnalysisService::new(
        Arc::new(source),
        Arc::new(extractor),
        cache,
        health,
        Arc::new(TracingObserver),
        config.pipeline.clone(),
    );

    let state = AppState {
        analysis: Arc::new(analysis),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict allowed origins once the web client has a fixed host
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
