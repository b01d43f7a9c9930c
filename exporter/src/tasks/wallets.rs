//! Wallet balance and delegator metrics.

use std::sync::Arc;

use crate::address::AccAddress;
use crate::client::NodeClient;
use crate::config::ScrapeConfig;
use crate::metrics::{DelegatorMetrics, WalletMetrics};
use crate::tasks::{TaskGroup, parse_amount};

/// Launches the balance fetch for one wallet, following pagination.
/// Balances of the configured denom are coefficient-scaled; other denoms
/// are exposed in base units.
pub fn collect_balances(
    group: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &WalletMetrics,
    config: &Arc<ScrapeConfig>,
    address: AccAddress,
) {
    let client = client.clone();
    let metrics = metrics.clone();
    let config = config.clone();
    group.spawn(async move {
        tracing::debug!(address = address.as_str(), "started querying wallet balances");
        let mut page_key: Option<String> = None;
        loop {
            let page = match client.balances(address.as_str(), page_key.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        address = address.as_str(),
                        error = %e,
                        "could not get wallet balances"
                    );
                    return;
                }
            };
            for coin in page.items {
                let Some(value) = parse_amount(&coin.amount, "wallet balance") else {
                    continue;
                };
                let scaled = if coin.denom == config.denom {
                    value / config.denom_coefficient
                } else {
                    value
                };
                metrics
                    .balance
                    .with_label_values(&[address.as_str(), &coin.denom])
                    .set(scaled);
            }
            match page.next_key {
                Some(key) => page_key = Some(key),
                None => break,
            }
        }
    });
}

/// Launches the delegation and unbonding fetches for one delegator.
pub fn collect_delegator(
    group: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &DelegatorMetrics,
    config: &Arc<ScrapeConfig>,
    address: AccAddress,
) {
    {
        let client = client.clone();
        let metrics = metrics.clone();
        let config = config.clone();
        let address = address.clone();
        group.spawn(async move {
            tracing::debug!(address = address.as_str(), "started querying delegations");
            match client.delegations(address.as_str()).await {
                Ok(delegations) => {
                    for delegation in delegations {
                        if let Some(value) =
                            parse_amount(&delegation.balance.amount, "delegation amount")
                        {
                            metrics
                                .delegated
                                .with_label_values(&[address.as_str(), &delegation.validator])
                                .set(value / config.denom_coefficient);
                        }
                    }
                }
                Err(e) => tracing::error!(
                    address = address.as_str(),
                    error = %e,
                    "could not get delegations"
                ),
            }
        });
    }

    {
        let client = client.clone();
        let metrics = metrics.clone();
        let config = config.clone();
        group.spawn(async move {
            tracing::debug!(
                address = address.as_str(),
                "started querying unbonding delegations"
            );
            match client.unbonding_delegations(address.as_str()).await {
                Ok(unbondings) => {
                    for unbonding in unbondings {
                        if let Some(value) =
                            parse_amount(&unbonding.balance, "unbonding amount")
                        {
                            metrics
                                .unbonding
                                .with_label_values(&[address.as_str(), &unbonding.validator])
                                .set(value / config.denom_coefficient);
                        }
                    }
                }
                Err(e) => tracing::error!(
                    address = address.as_str(),
                    error = %e,
                    "could not get unbonding delegations"
                ),
            }
        });
    }
}
