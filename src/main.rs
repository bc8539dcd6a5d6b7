//! School meal proxy — binary entrypoint.
//! Loads configuration, starts the cache sweeper, and serves the Axum router.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use school_meal_proxy::{api, cache::spawn_sweeper, metrics::Metrics, AppState, Config};

/// Compact logs by default; JSON lines when LOG_FORMAT=json.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("school_meal_proxy=info,tower_http=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = Config::load().context("loading configuration")?;
    if cfg.neis_api_key.is_empty() {
        warn!("NEIS_API_KEY is empty; the hub will reject requests");
    }

    let metrics = Metrics::init(cfg.cache_ttl_secs).context("installing metrics recorder")?;
    let state = AppState::from_config(&cfg).context("building NEIS client")?;
    let _sweeper = spawn_sweeper(state.cache().clone(), cfg.sweep_interval());

    let router = api::app(state, &cfg.static_dir).merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");
    axum::serve(listener, router).await.context("serving")?;
    Ok(())
}
