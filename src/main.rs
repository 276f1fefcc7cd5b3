//! News Collector — Binary Entrypoint
//! Boots the Axum HTTP server wiring the trigger page, health, and metrics
//! routes. Configuration problems abort startup here; everything after
//! this point recovers per feed or per destination.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_collector::api::{self, AppState};
use news_collector::metrics::Metrics;
use news_collector::registry::FeedRegistry;
use news_collector::runner::Collector;
use news_collector::settings::Settings;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_collector=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::from_env()?;
    let registry = FeedRegistry::load_default()?;
    tracing::info!(
        feeds = registry.feeds().len(),
        categories = registry.categories().len(),
        "feed registry loaded"
    );

    let metrics = Metrics::init();
    let collector = Collector::from_settings(&settings, registry)?;
    let router = api::create_router(AppState::new(collector)).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
