//! Validator detail metrics.

use std::sync::Arc;

use crate::address::ValAddress;
use crate::client::{NodeClient, ValidatorInfo};
use crate::config::ScrapeConfig;
use crate::metrics::ValidatorMetrics;
use crate::tasks::{TaskGroup, parse_amount};

const BONDED_STATUS: &str = "BOND_STATUS_BONDED";

fn record(metrics: &ValidatorMetrics, config: &ScrapeConfig, info: &ValidatorInfo) {
    let labels = [info.operator_address.as_str(), info.moniker.as_str()];
    if let Some(tokens) = parse_amount(&info.tokens, "validator tokens") {
        metrics
            .tokens
            .with_label_values(&labels)
            .set(tokens / config.denom_coefficient);
    }
    if let Some(shares) = parse_amount(&info.delegator_shares, "delegator shares") {
        metrics
            .delegator_shares
            .with_label_values(&labels)
            .set(shares / config.denom_coefficient);
    }
    if let Some(rate) = parse_amount(&info.commission_rate, "commission rate") {
        metrics.commission_rate.with_label_values(&labels).set(rate);
    }
    metrics
        .status
        .with_label_values(&labels)
        .set(if info.status == BONDED_STATUS { 1.0 } else { 0.0 });
    metrics
        .jailed
        .with_label_values(&labels)
        .set(if info.jailed { 1.0 } else { 0.0 });
}

/// Launches the detail fetch for one validator.
pub fn collect_one(
    group: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &ValidatorMetrics,
    config: &Arc<ScrapeConfig>,
    operator: ValAddress,
) {
    let client = client.clone();
    let metrics = metrics.clone();
    let config = config.clone();
    group.spawn(async move {
        tracing::debug!(address = operator.as_str(), "started querying validator");
        match client.validator(operator.as_str()).await {
            Ok(info) => record(&metrics, &config, &info),
            Err(e) => {
                tracing::error!(address = operator.as_str(), error = %e, "could not get validator")
            }
        }
    });
}

/// Launches the full validator-set fetch, following pagination.
pub fn collect_set(
    group: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &ValidatorMetrics,
    config: &Arc<ScrapeConfig>,
) {
    let client = client.clone();
    let metrics = metrics.clone();
    let config = config.clone();
    group.spawn(async move {
        tracing::debug!("started querying validator set");
        let mut page_key: Option<String> = None;
        loop {
            let page = match client.validators(page_key.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(error = %e, "could not get validator set");
                    return;
                }
            };
            for info in &page.items {
                record(&metrics, &config, info);
            }
            match page.next_key {
                Some(key) => page_key = Some(key),
                None => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn record_scales_tokens_and_maps_status() {
        let registry = Registry::new();
        let config = ScrapeConfig {
            denom_coefficient: 1_000_000.0,
            ..Default::default()
        };
        let metrics = ValidatorMetrics::register(&registry, &config).expect("register");
        let info = ValidatorInfo {
            operator_address: "seivaloper1xyz".to_string(),
            moniker: "node-one".to_string(),
            status: "BOND_STATUS_BONDED".to_string(),
            jailed: false,
            tokens: "2000000".to_string(),
            delegator_shares: "2000000".to_string(),
            commission_rate: "0.05".to_string(),
        };

        record(&metrics, &config, &info);

        let labels = ["seivaloper1xyz", "node-one"];
        assert_eq!(metrics.tokens.with_label_values(&labels).get(), 2.0);
        assert_eq!(metrics.status.with_label_values(&labels).get(), 1.0);
        assert_eq!(metrics.jailed.with_label_values(&labels).get(), 0.0);
    }

    #[test]
    fn unbonded_status_maps_to_zero() {
        let registry = Registry::new();
        let config = ScrapeConfig::default();
        let metrics = ValidatorMetrics::register(&registry, &config).expect("register");
        let info = ValidatorInfo {
            operator_address: "seivaloper1abc".to_string(),
            moniker: "node-two".to_string(),
            status: "BOND_STATUS_UNBONDED".to_string(),
            jailed: true,
            tokens: "5".to_string(),
            delegator_shares: "5".to_string(),
            commission_rate: "0.1".to_string(),
        };

        record(&metrics, &config, &info);

        let labels = ["seivaloper1abc", "node-two"];
        assert_eq!(metrics.status.with_label_values(&labels).get(), 0.0);
        assert_eq!(metrics.jailed.with_label_values(&labels).get(), 1.0);
    }
}
