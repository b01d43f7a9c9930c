//! Metric family structs.
//!
//! Each family owns the instruments one fetch-task family writes to.
//! Families register into the per-request registry with the configured
//! const labels (`chain_id`), mirroring how the instruments appear in the
//! exposition output.

use prometheus::{Gauge, GaugeVec, Opts, Registry};

use crate::config::ScrapeConfig;

fn opts(name: &str, help: &str, config: &ScrapeConfig) -> Opts {
    Opts::new(name, help).const_labels(config.const_labels())
}

fn gauge(
    registry: &Registry,
    config: &ScrapeConfig,
    name: &str,
    help: &str,
) -> Result<Gauge, prometheus::Error> {
    let g = Gauge::with_opts(opts(name, help, config))?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

fn gauge_vec(
    registry: &Registry,
    config: &ScrapeConfig,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<GaugeVec, prometheus::Error> {
    let g = GaugeVec::new(opts(name, help, config), labels)?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

/// Chain-wide facts: sync state, token pools, supply, node versions.
#[derive(Clone)]
pub struct GeneralMetrics {
    pub bonded_tokens: Gauge,
    pub not_bonded_tokens: Gauge,
    /// Community pool balance per denom, coefficient-scaled.
    pub community_pool: GaugeVec,
    /// Total supply per denom, summed across pagination.
    pub supply_total: GaugeVec,
    pub latest_block_height: Gauge,
    /// 1 while the node reports itself as catching up.
    pub syncing: Gauge,
    pub voting_period_proposals: Gauge,
    pub application_version: GaugeVec,
    pub node_info: GaugeVec,
}

impl GeneralMetrics {
    pub fn register(
        registry: &Registry,
        config: &ScrapeConfig,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            bonded_tokens: gauge(
                registry,
                config,
                "cosmos_general_bonded_tokens",
                "Bonded tokens",
            )?,
            not_bonded_tokens: gauge(
                registry,
                config,
                "cosmos_general_not_bonded_tokens",
                "Not bonded tokens",
            )?,
            community_pool: gauge_vec(
                registry,
                config,
                "cosmos_general_community_pool",
                "Community pool",
                &["denom"],
            )?,
            supply_total: gauge_vec(
                registry,
                config,
                "cosmos_general_supply_total",
                "Total supply",
                &["denom"],
            )?,
            latest_block_height: gauge(
                registry,
                config,
                "cosmos_latest_block_height",
                "Latest block height",
            )?,
            syncing: gauge(registry, config, "cosmos_node_syncing", "Is node syncing")?,
            voting_period_proposals: gauge(
                registry,
                config,
                "cosmos_gov_voting_period_proposals",
                "Proposals currently in voting period",
            )?,
            application_version: gauge_vec(
                registry,
                config,
                "cosmos_node_application_version",
                "Application version info of the chain",
                &["chain_name", "app_version", "git_commit", "sdk_version"],
            )?,
            node_info: gauge_vec(
                registry,
                config,
                "cosmos_node_default_node_info",
                "Default node info of the chain",
                &["network", "version", "moniker"],
            )?,
        })
    }
}

/// Governance proposals, one labeled sample per proposal.
#[derive(Clone)]
pub struct ProposalMetrics {
    /// Value is the proposal id; the interesting facts ride the labels.
    pub proposals: GaugeVec,
}

impl ProposalMetrics {
    pub fn register(
        registry: &Registry,
        config: &ScrapeConfig,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            proposals: gauge_vec(
                registry,
                config,
                "cosmos_proposals",
                "Governance proposals",
                &["title", "status", "voting_start_time", "voting_end_time"],
            )?,
        })
    }
}

/// Per-validator staking facts, labeled by address and moniker.
#[derive(Clone)]
pub struct ValidatorMetrics {
    pub tokens: GaugeVec,
    pub delegator_shares: GaugeVec,
    pub commission_rate: GaugeVec,
    /// 1 when bonded, 0 otherwise.
    pub status: GaugeVec,
    pub jailed: GaugeVec,
}

impl ValidatorMetrics {
    pub fn register(
        registry: &Registry,
        config: &ScrapeConfig,
    ) -> Result<Self, prometheus::Error> {
        let labels = &["address", "moniker"];
        Ok(Self {
            tokens: gauge_vec(
                registry,
                config,
                "cosmos_validator_tokens",
                "Validator bonded tokens",
                labels,
            )?,
            delegator_shares: gauge_vec(
                registry,
                config,
                "cosmos_validator_delegator_shares",
                "Validator delegator shares",
                labels,
            )?,
            commission_rate: gauge_vec(
                registry,
                config,
                "cosmos_validator_commission_rate",
                "Validator commission rate",
                labels,
            )?,
            status: gauge_vec(
                registry,
                config,
                "cosmos_validator_status",
                "Validator bond status (1 = bonded)",
                labels,
            )?,
            jailed: gauge_vec(
                registry,
                config,
                "cosmos_validator_jailed",
                "Validator jailed flag",
                labels,
            )?,
        })
    }
}

/// Wallet balances, labeled by address and denom.
#[derive(Clone)]
pub struct WalletMetrics {
    pub balance: GaugeVec,
}

impl WalletMetrics {
    pub fn register(
        registry: &Registry,
        config: &ScrapeConfig,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            balance: gauge_vec(
                registry,
                config,
                "cosmos_wallet_balance",
                "Wallet balance",
                &["address", "denom"],
            )?,
        })
    }
}

/// Per-delegation amounts for one delegator address.
#[derive(Clone)]
pub struct DelegatorMetrics {
    pub delegated: GaugeVec,
    pub unbonding: GaugeVec,
}

impl DelegatorMetrics {
    pub fn register(
        registry: &Registry,
        config: &ScrapeConfig,
    ) -> Result<Self, prometheus::Error> {
        let labels = &["address", "validator"];
        Ok(Self {
            delegated: gauge_vec(
                registry,
                config,
                "cosmos_delegator_delegation_amount",
                "Delegated amount per validator",
                labels,
            )?,
            unbonding: gauge_vec(
                registry,
                config,
                "cosmos_delegator_unbonding_amount",
                "Unbonding amount per validator",
                labels,
            )?,
        })
    }
}

/// Chain staking parameters.
#[derive(Clone)]
pub struct ParamsMetrics {
    pub max_validators: Gauge,
    pub unbonding_time_seconds: Gauge,
    pub bond_denom: GaugeVec,
}

impl ParamsMetrics {
    pub fn register(
        registry: &Registry,
        config: &ScrapeConfig,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            max_validators: gauge(
                registry,
                config,
                "cosmos_params_max_validators",
                "Maximum size of the active validator set",
            )?,
            unbonding_time_seconds: gauge(
                registry,
                config,
                "cosmos_params_unbonding_time_seconds",
                "Unbonding period in seconds",
            )?,
            bond_denom: gauge_vec(
                registry,
                config,
                "cosmos_params_bond_denom",
                "Staking bond denom",
                &["denom"],
            )?,
        })
    }
}

/// Scheduled software upgrade, if any.
#[derive(Clone)]
pub struct UpgradeMetrics {
    pub planned: Gauge,
    pub plan_height: GaugeVec,
}

impl UpgradeMetrics {
    pub fn register(
        registry: &Registry,
        config: &ScrapeConfig,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            planned: gauge(
                registry,
                config,
                "cosmos_upgrade_planned",
                "Whether an upgrade plan is scheduled",
            )?,
            plan_height: gauge_vec(
                registry,
                config,
                "cosmos_upgrade_plan_height",
                "Scheduled upgrade height",
                &["name"],
            )?,
        })
    }
}

/// Validator votes on active proposals.
///
/// A validator that has not voted still gets a sample (`voted="no"`,
/// `vote_option="NOT_VOTED"`); the absence of a vote is the fact this
/// family exists to expose.
#[derive(Clone)]
pub struct VoteMetrics {
    pub vote: GaugeVec,
}

impl VoteMetrics {
    pub fn register(
        registry: &Registry,
        config: &ScrapeConfig,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            vote: gauge_vec(
                registry,
                config,
                "cosmos_validator_proposal_vote",
                "Validator vote on an active proposal (1 = voted)",
                &["validator", "proposal_id", "voted", "vote_option"],
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ScrapeConfig {
        ScrapeConfig {
            chain_id: "testchain-1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn general_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = GeneralMetrics::register(&registry, &test_config()).expect("register");

        metrics.bonded_tokens.set(1234.0);
        metrics.syncing.set(0.0);
        metrics
            .supply_total
            .with_label_values(&["uatom"])
            .set(42.0);

        let families = registry.gather();
        assert!(!families.is_empty());
    }

    #[test]
    fn const_labels_appear_in_rendered_output() {
        let registry = Registry::new();
        let metrics = GeneralMetrics::register(&registry, &test_config()).expect("register");
        metrics.latest_block_height.set(100.0);

        let text = crate::metrics::render(&registry);
        assert!(text.contains("cosmos_latest_block_height"));
        assert!(text.contains("chain_id=\"testchain-1\""));
    }

    #[test]
    fn vote_metrics_accept_not_voted_sample() {
        let registry = Registry::new();
        let metrics = VoteMetrics::register(&registry, &test_config()).expect("register");
        metrics
            .vote
            .with_label_values(&["seivaloper1xyz", "12", "no", "NOT_VOTED"])
            .set(0.0);

        let text = crate::metrics::render(&registry);
        assert!(text.contains("vote_option=\"NOT_VOTED\""));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Registry::new();
        let config = test_config();
        assert!(GeneralMetrics::register(&registry, &config).is_ok());
        assert!(GeneralMetrics::register(&registry, &config).is_err());
    }
}
