//! Request-scoped metric namespaces.
//!
//! Every scrape request builds a fresh [`prometheus::Registry`], registers
//! the family structs its configuration calls for, lets the fetch tasks
//! fill them concurrently, renders the registry once, and drops it. No
//! instrument survives across requests.
//!
//! Typical usage in a handler:
//!
//! ```ignore
//! let registry = Registry::new();
//! let general = GeneralMetrics::register(&registry, &config)?;
//! // ... run fetch tasks ...
//! let body = metrics::render(&registry);
//! ```

pub mod families;

use prometheus::{Encoder, Registry, TextEncoder};

pub use families::{
    DelegatorMetrics, GeneralMetrics, ParamsMetrics, ProposalMetrics, UpgradeMetrics,
    ValidatorMetrics, VoteMetrics, WalletMetrics,
};

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Encodes all metrics of a filled registry into the Prometheus text
/// format. Encoding failures are logged and yield an empty body rather
/// than failing the scrape.
pub fn render(registry: &Registry) -> String {
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
