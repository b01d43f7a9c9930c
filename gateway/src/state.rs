//! Shared application state.

use std::sync::Arc;

use exporter::{NodeClient, ScrapeConfig};

/// State held by every request handler.
///
/// Both fields are resolved once at startup and read-only afterwards;
/// each scrape builds its own registry, so handlers share nothing
/// mutable. Wrapped in an [`Arc`] and passed via Axum's `State`
/// extractor.
pub struct AppState {
    /// Upstream node client, shared by every fetch task.
    pub client: Arc<dyn NodeClient>,
    /// Resolved scrape configuration (chain id and denom filled in).
    pub config: Arc<ScrapeConfig>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
