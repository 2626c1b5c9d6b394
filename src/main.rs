use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cli;
mod config;
mod endpoint;
mod errors;
mod llm;
mod rate_limit;
mod ticket;
mod tracker;

use llm::LlmClient;
use rate_limit::RateLimiter;
use tracker::client::TrackerClient;

/// Shared application state passed to handlers.
///
/// Deliberately small: the rate limiter's map is the only cross-request
/// mutable state. Tracker credentials are request-scoped and never land here.
pub struct AppState {
    pub config: config::Config,
    pub limiter: RateLimiter,
    pub llm: LlmClient,
    pub tracker: TrackerClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "bugrelay=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let port = match args.command {
        Some(cli::Commands::Serve { port }) => port.unwrap_or(cfg.port),
        None => cfg.port,
    };

    run_server(cfg, port).await
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    let base_path = endpoint::resolve_base_path(
        cfg.base_path_override.as_deref(),
        cfg.public_hostname.as_deref(),
    );
    let cors = cors_layer(&cfg.allowed_origins);

    let state = Arc::new(AppState {
        limiter: RateLimiter::new(Duration::from_secs(cfg.rate_window_secs)),
        llm: LlmClient::new(cfg.llm_api_key.clone(), cfg.llm_model.clone()),
        tracker: TrackerClient::new(),
        config: cfg,
    });

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest(&base_path, api::api_router())
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("BugRelay listening on {} (API under {})", addr, base_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Empty origin list = permissive (local dev). Otherwise only the configured
/// origins may call the API.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        tracing::warn!("BUGRELAY_ALLOWED_ORIGINS is not set — allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
