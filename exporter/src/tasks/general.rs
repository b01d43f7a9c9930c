//! General chain metrics: sync state, pools, supply, versions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::client::NodeClient;
use crate::config::ScrapeConfig;
use crate::metrics::GeneralMetrics;
use crate::tasks::{TaskGroup, parse_amount};

/// Launches the general fetch tasks into `group`. Each task is
/// independent; a failing one leaves only its own instruments unset.
pub fn collect(
    group: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &GeneralMetrics,
    config: &Arc<ScrapeConfig>,
) {
    {
        let client = client.clone();
        let metrics = metrics.clone();
        group.spawn(async move {
            tracing::debug!("started querying latest block height");
            let query_start = Instant::now();
            match client.latest_block_height().await {
                Ok(height) => {
                    tracing::debug!(
                        request_time = query_start.elapsed().as_secs_f64(),
                        "finished querying latest block height"
                    );
                    metrics.latest_block_height.set(height as f64);
                }
                Err(e) => tracing::error!(error = %e, "could not get latest block height"),
            }
        });
    }

    {
        let client = client.clone();
        let metrics = metrics.clone();
        group.spawn(async move {
            tracing::debug!("started querying node syncing");
            match client.syncing().await {
                Ok(syncing) => metrics.syncing.set(if syncing { 1.0 } else { 0.0 }),
                Err(e) => tracing::error!(error = %e, "could not get node syncing"),
            }
        });
    }

    {
        let client = client.clone();
        let metrics = metrics.clone();
        group.spawn(async move {
            tracing::debug!("started querying staking pool");
            match client.staking_pool().await {
                Ok(pool) => {
                    if let Some(bonded) = parse_amount(&pool.bonded_tokens, "bonded tokens") {
                        metrics.bonded_tokens.set(bonded);
                    }
                    if let Some(not_bonded) =
                        parse_amount(&pool.not_bonded_tokens, "not bonded tokens")
                    {
                        metrics.not_bonded_tokens.set(not_bonded);
                    }
                }
                Err(e) => tracing::error!(error = %e, "could not get staking pool"),
            }
        });
    }

    {
        let client = client.clone();
        let metrics = metrics.clone();
        let config = config.clone();
        group.spawn(async move {
            tracing::debug!("started querying community pool");
            match client.community_pool().await {
                Ok(pool) => {
                    for coin in pool {
                        if let Some(value) = parse_amount(&coin.amount, "community pool coin") {
                            metrics
                                .community_pool
                                .with_label_values(&[&config.denom])
                                .set(value / config.denom_coefficient);
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "could not get community pool"),
            }
        });
    }

    {
        let client = client.clone();
        let metrics = metrics.clone();
        group.spawn(async move {
            tracing::debug!("started querying node info");
            match client.node_info().await {
                Ok(info) => {
                    metrics
                        .application_version
                        .with_label_values(&[
                            &info.app_name,
                            &info.app_version,
                            &info.git_commit,
                            &info.sdk_version,
                        ])
                        .set(1.0);
                    metrics
                        .node_info
                        .with_label_values(&[&info.network, &info.node_version, &info.moniker])
                        .set(1.0);
                }
                Err(e) => tracing::error!(error = %e, "could not get node info"),
            }
        });
    }

    {
        let client = client.clone();
        let metrics = metrics.clone();
        group.spawn(async move {
            tracing::debug!("started querying bank total supply");
            // Cursor-following loop; a denom may span pages, so values
            // are summed into the gauge rather than overwritten.
            let mut totals: HashMap<String, f64> = HashMap::new();
            let mut page_key: Option<String> = None;
            loop {
                let page = match client.total_supply(page_key.as_deref()).await {
                    Ok(page) => page,
                    Err(e) => {
                        tracing::error!(error = %e, "could not get bank total supply");
                        return;
                    }
                };
                for coin in page.items {
                    if let Some(value) = parse_amount(&coin.amount, "total supply coin") {
                        *totals.entry(coin.denom).or_insert(0.0) += value;
                    }
                }
                match page.next_key {
                    Some(key) => page_key = Some(key),
                    None => break,
                }
            }
            for (denom, total) in totals {
                metrics.supply_total.with_label_values(&[&denom]).set(total);
            }
        });
    }

    {
        let client = client.clone();
        let metrics = metrics.clone();
        let config = config.clone();
        group.spawn(async move {
            tracing::debug!("started querying active proposal count");
            let count = if config.prop_v1 {
                client.proposals_v1(true).await.map(|p| p.len())
            } else {
                client.proposals_legacy(true).await.map(|p| p.len())
            };
            match count {
                Ok(count) => metrics.voting_period_proposals.set(count as f64),
                Err(e) => tracing::error!(error = %e, "could not get active proposals"),
            }
        });
    }
}
