mod applications;
mod auth;
mod config;
mod cvs;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LogFormat};
use crate::db::{create_pool, run_migrations};
use crate::jobs::sources::JobSourceRegistry;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;

fn init_logging(config: &Config) {
    let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{crate_target}={level},tower_http={level}",
            level = config.rust_log
        ))
    });
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(&config);

    info!("Starting Jobpilot API v{}", env!("CARGO_PKG_VERSION"));
    for path in config.missing_cv_source_paths() {
        warn!("CV source path does not exist: {}", path.display());
    }

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;

    let llm = LlmClient::new(config.llm.clone()).context("Failed to build LLM client")?;
    info!(
        "LLM client initialized (default: {}, advanced: {})",
        config.llm.default_model, config.llm.advanced_model
    );

    let sources =
        JobSourceRegistry::from_config(&config.job_sources).context("Failed to build job sources")?;
    let enabled: Vec<&str> = sources.enabled().iter().map(|s| s.id()).collect();
    info!("Job sources enabled: {}", enabled.join(", "));

    let cors = cors_layer(&config.cors_origins);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        llm: Arc::new(llm),
        sources: Arc::new(sources),
        config: Arc::new(config),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
