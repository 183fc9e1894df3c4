//! GeoIdentify — Binary Entrypoint
//! Boots the Axum HTTP server: loads the knowledge base, wires routes,
//! shared state, and middleware.

mod api;
mod debug;
mod kb;
mod metrics;
mod predict;

use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api::AppState;
use crate::kb::KnowledgeBase;
use crate::metrics::Metrics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - GEOIDENTIFY_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("GEOIDENTIFY_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geo_identify=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables KNOWLEDGE_BASE_PATH overrides from .env.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // The knowledge base is the whole service; refusing to start without it
    // beats serving empty predictions.
    let kb = KnowledgeBase::load().expect("Failed to load knowledge base");
    info!(
        countries = kb.countries.len(),
        features = kb.features.len(),
        categories = kb.categories.len(),
        "knowledge base loaded"
    );

    let metrics = Metrics::init();

    let state = AppState::new(kb);
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
