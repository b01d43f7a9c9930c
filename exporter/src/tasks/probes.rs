//! Chain-specific oracle and bridge probes.
//!
//! Several networks expose one or two extra endpoints worth scraping
//! (oracle miss counters, bridge nonces). The shape is always the same:
//! fetch a JSON document, pull a few numeric fields out, bump a single
//! labeled counter. One probe family parameterized by endpoint and
//! extractor covers all of them.

use std::sync::Arc;

use prometheus::{CounterVec, Opts, Registry};
use serde_json::Value;

use crate::client::NodeClient;
use crate::config::{Network, ScrapeConfig};
use crate::tasks::TaskGroup;

/// One probed metric: where to fetch it and how to read the samples out
/// of the response document.
pub struct ProbeSpec {
    pub metric: &'static str,
    pub help: &'static str,
    /// Builds the endpoint path for a validator/orchestrator address.
    pub path: fn(&str) -> String,
    /// Pulls `(type label, value)` samples out of the response.
    pub extract: fn(&Value) -> Result<Vec<(&'static str, f64)>, String>,
}

fn str_field<'v>(value: &'v Value, pointer: &str) -> Result<&'v str, String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing field {pointer}"))
}

fn num_field(value: &Value, pointer: &str) -> Result<f64, String> {
    let raw = str_field(value, pointer)?;
    raw.parse::<f64>()
        .map_err(|e| format!("field {pointer} value {raw:?} is not a number: {e}"))
}

fn extract_sei_penalties(value: &Value) -> Result<Vec<(&'static str, f64)>, String> {
    Ok(vec![
        ("miss", num_field(value, "/vote_penalty_counter/miss_count")?),
        (
            "abstain",
            num_field(value, "/vote_penalty_counter/abstain_count")?,
        ),
        (
            "success",
            num_field(value, "/vote_penalty_counter/success_count")?,
        ),
    ])
}

fn extract_miss_counter(value: &Value) -> Result<Vec<(&'static str, f64)>, String> {
    Ok(vec![("miss", num_field(value, "/miss_counter")?)])
}

fn extract_pryzm_miss(value: &Value) -> Result<Vec<(&'static str, f64)>, String> {
    Ok(vec![("miss", num_field(value, "/miss_counter/counter")?)])
}

fn extract_peggy_state(value: &Value) -> Result<Vec<(&'static str, f64)>, String> {
    Ok(vec![(
        "nonce",
        num_field(value, "/state/last_observed_nonce")?,
    )])
}

fn extract_peggy_claim(value: &Value) -> Result<Vec<(&'static str, f64)>, String> {
    Ok(vec![
        (
            "nonce",
            num_field(value, "/last_claim_event/ethereum_event_nonce")?,
        ),
        (
            "event_height",
            num_field(value, "/last_claim_event/ethereum_event_height")?,
        ),
    ])
}

static SEI_PROBES: &[ProbeSpec] = &[ProbeSpec {
    metric: "cosmos_oracle_vote_penalty_count",
    help: "Oracle vote penalty counts",
    path: |address| format!("/sei-protocol/seichain/oracle/validators/{address}/vote_penalty_counter"),
    extract: extract_sei_penalties,
}];

static KUJIRA_PROBES: &[ProbeSpec] = &[ProbeSpec {
    metric: "cosmos_kujira_oracle_vote_miss_count",
    help: "Oracle vote miss count",
    path: |address| format!("/oracle/validators/{address}/miss"),
    extract: extract_miss_counter,
}];

static INJECTIVE_PROBES: &[ProbeSpec] = &[
    ProbeSpec {
        metric: "cosmos_injective_peggy_last_observed_nonce",
        help: "Last observed bridge nonce",
        path: |_| "/peggy/v1/module_state".to_string(),
        extract: extract_peggy_state,
    },
    ProbeSpec {
        metric: "cosmos_injective_peggy_last_claimed",
        help: "Last claimed ethereum event",
        path: |address| format!("/peggy/v1/oracle/event/{address}"),
        extract: extract_peggy_claim,
    },
];

static INITIA_PROBES: &[ProbeSpec] = &[ProbeSpec {
    metric: "cosmos_initia_oracle_vote_fail_count",
    help: "Oracle vote miss count",
    path: |address| format!("/initia/oracle/v1/validators/{address}/miss_counter"),
    extract: extract_miss_counter,
}];

static PRYZM_PROBES: &[ProbeSpec] = &[ProbeSpec {
    metric: "cosmos_pryzm_feeder_miss_counter",
    help: "Feeder miss count",
    path: |address| format!("/refractedlabs/oracle/v1/miss_counter/{address}"),
    extract: extract_pryzm_miss,
}];

/// The probe table for a network.
pub fn specs_for(network: Network) -> &'static [ProbeSpec] {
    match network {
        Network::Sei => SEI_PROBES,
        Network::Kujira => KUJIRA_PROBES,
        Network::Injective => INJECTIVE_PROBES,
        Network::Initia => INITIA_PROBES,
        Network::Pryzm => PRYZM_PROBES,
    }
}

/// Counters for one probe table, index-aligned with its specs.
#[derive(Clone)]
pub struct ProbeMetrics {
    counters: Vec<CounterVec>,
}

impl ProbeMetrics {
    pub fn register(
        registry: &Registry,
        config: &ScrapeConfig,
        specs: &[ProbeSpec],
    ) -> Result<Self, prometheus::Error> {
        let mut counters = Vec::with_capacity(specs.len());
        for spec in specs {
            let counter = CounterVec::new(
                Opts::new(spec.metric, spec.help).const_labels(config.const_labels()),
                &["type", "validator"],
            )?;
            registry.register(Box::new(counter.clone()))?;
            counters.push(counter);
        }
        Ok(Self { counters })
    }
}

/// Launches one fetch task per probe of the configured network.
pub fn collect(
    group: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &ProbeMetrics,
    network: Network,
    address: &str,
) {
    let specs = specs_for(network);
    for (spec, counter) in specs.iter().zip(metrics.counters.iter()) {
        let client = client.clone();
        let counter = counter.clone();
        let address = address.to_string();
        let path = (spec.path)(&address);
        let extract = spec.extract;
        let metric = spec.metric;
        group.spawn(async move {
            tracing::debug!(metric, path, "started probe query");
            let document = match client.get_json(&path).await {
                Ok(document) => document,
                Err(e) => {
                    tracing::error!(metric, error = %e, "could not fetch probe endpoint");
                    return;
                }
            };
            match extract(&document) {
                Ok(samples) => {
                    for (kind, value) in samples {
                        counter.with_label_values(&[kind, &address]).inc_by(value);
                    }
                }
                Err(e) => tracing::error!(metric, error = e, "could not decode probe response"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sei_penalties_extract_three_samples() {
        let document = json!({
            "vote_penalty_counter": {
                "miss_count": "12",
                "abstain_count": "3",
                "success_count": "4500"
            }
        });
        let samples = extract_sei_penalties(&document).expect("extracts");
        assert_eq!(
            samples,
            vec![("miss", 12.0), ("abstain", 3.0), ("success", 4500.0)]
        );
    }

    #[test]
    fn peggy_claim_extracts_nonce_and_height() {
        let document = json!({
            "last_claim_event": {
                "ethereum_event_nonce": "777",
                "ethereum_event_height": "19000000"
            }
        });
        let samples = extract_peggy_claim(&document).expect("extracts");
        assert_eq!(samples, vec![("nonce", 777.0), ("event_height", 19000000.0)]);
    }

    #[test]
    fn pryzm_miss_counter_is_nested() {
        let document = json!({"miss_counter": {"validator": "pryzmvaloper1x", "counter": "9"}});
        assert_eq!(
            extract_pryzm_miss(&document).expect("extracts"),
            vec![("miss", 9.0)]
        );
    }

    #[test]
    fn missing_field_is_a_decode_error() {
        let document = json!({"state": {}});
        assert!(extract_peggy_state(&document).is_err());
    }

    #[test]
    fn every_network_has_a_probe_table() {
        for network in [
            Network::Sei,
            Network::Kujira,
            Network::Injective,
            Network::Initia,
            Network::Pryzm,
        ] {
            assert!(!specs_for(network).is_empty());
        }
    }
}
