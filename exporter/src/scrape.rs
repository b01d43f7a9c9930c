//! Request-scoped scrape orchestration.
//!
//! Every scrape builds a fresh [`Registry`], registers the metric
//! families the request calls for, fans the fetch tasks out into a
//! [`TaskGroup`], waits for all of them, and renders the exposition
//! text. Nothing is shared between requests except the client and the
//! resolved configuration, so concurrent scrapes cannot observe each
//! other's samples.

use std::sync::Arc;

use prometheus::Registry;

use crate::address::{AccAddress, ValAddress};
use crate::client::NodeClient;
use crate::config::ScrapeConfig;
use crate::metrics::{
    self, DelegatorMetrics, GeneralMetrics, ParamsMetrics, ProposalMetrics, UpgradeMetrics,
    ValidatorMetrics, VoteMetrics, WalletMetrics,
};
use crate::tasks::probes::{self, ProbeMetrics};
use crate::tasks::{self, TaskGroup};

/// Registration against a fresh registry only fails on programming
/// errors (duplicate or malformed names). The scrape degrades to an
/// empty family rather than failing the request.
fn registered<T>(family: Result<T, prometheus::Error>) -> Option<T> {
    match family {
        Ok(family) => Some(family),
        Err(e) => {
            tracing::error!(error = %e, "could not register metric family");
            None
        }
    }
}

fn parse_validator(address: &str, config: &ScrapeConfig) -> Option<ValAddress> {
    match ValAddress::from_bech32(address, &config.validator_prefix) {
        Ok(operator) => Some(operator),
        Err(e) => {
            tracing::error!(address, error = %e, "invalid validator address");
            None
        }
    }
}

fn parse_account(address: &str, config: &ScrapeConfig) -> Option<AccAddress> {
    match AccAddress::from_bech32(address, &config.account_prefix) {
        Ok(account) => Some(account),
        Err(e) => {
            tracing::error!(address, error = %e, "invalid account address");
            None
        }
    }
}

/// Chain-wide metrics: sync state, pools, supply, versions.
pub async fn general(client: &Arc<dyn NodeClient>, config: &Arc<ScrapeConfig>) -> String {
    let registry = Registry::new();
    let mut group = TaskGroup::new();
    if let Some(family) = registered(GeneralMetrics::register(&registry, config)) {
        tasks::general::collect(&mut group, client, &family, config);
    }
    group.join_all().await;
    metrics::render(&registry)
}

/// Detail metrics for one validator. A malformed address is logged and
/// produces an empty body; no fetch task is launched for it.
pub async fn validator(
    client: &Arc<dyn NodeClient>,
    config: &Arc<ScrapeConfig>,
    address: &str,
) -> String {
    let registry = Registry::new();
    let Some(operator) = parse_validator(address, config) else {
        return metrics::render(&registry);
    };
    let mut group = TaskGroup::new();
    if let Some(family) = registered(ValidatorMetrics::register(&registry, config)) {
        tasks::validators::collect_one(&mut group, client, &family, config, operator);
    }
    group.join_all().await;
    metrics::render(&registry)
}

/// Detail metrics for the whole validator set.
pub async fn validators(client: &Arc<dyn NodeClient>, config: &Arc<ScrapeConfig>) -> String {
    let registry = Registry::new();
    let mut group = TaskGroup::new();
    if let Some(family) = registered(ValidatorMetrics::register(&registry, config)) {
        tasks::validators::collect_set(&mut group, client, &family, config);
    }
    group.join_all().await;
    metrics::render(&registry)
}

/// Balance metrics for one wallet address.
pub async fn wallet(
    client: &Arc<dyn NodeClient>,
    config: &Arc<ScrapeConfig>,
    address: &str,
) -> String {
    let registry = Registry::new();
    let Some(account) = parse_account(address, config) else {
        return metrics::render(&registry);
    };
    let mut group = TaskGroup::new();
    if let Some(family) = registered(WalletMetrics::register(&registry, config)) {
        tasks::wallets::collect_balances(&mut group, client, &family, config, account);
    }
    group.join_all().await;
    metrics::render(&registry)
}

/// Delegation and unbonding metrics for one delegator address.
pub async fn delegator(
    client: &Arc<dyn NodeClient>,
    config: &Arc<ScrapeConfig>,
    address: &str,
) -> String {
    let registry = Registry::new();
    let Some(account) = parse_account(address, config) else {
        return metrics::render(&registry);
    };
    let mut group = TaskGroup::new();
    if let Some(family) = registered(DelegatorMetrics::register(&registry, config)) {
        tasks::wallets::collect_delegator(&mut group, client, &family, config, account);
    }
    group.join_all().await;
    metrics::render(&registry)
}

/// Chain staking parameters.
pub async fn params(client: &Arc<dyn NodeClient>, config: &Arc<ScrapeConfig>) -> String {
    let registry = Registry::new();
    let mut group = TaskGroup::new();
    if let Some(family) = registered(ParamsMetrics::register(&registry, config)) {
        tasks::params::collect_params(&mut group, client, &family);
    }
    group.join_all().await;
    metrics::render(&registry)
}

/// Governance proposals, all of them.
pub async fn proposals(client: &Arc<dyn NodeClient>, config: &Arc<ScrapeConfig>) -> String {
    let registry = Registry::new();
    let mut group = TaskGroup::new();
    if let Some(family) = registered(ProposalMetrics::register(&registry, config)) {
        tasks::proposals::collect(&mut group, client, &family, config, false);
    }
    group.join_all().await;
    metrics::render(&registry)
}

/// Scheduled upgrade plan.
pub async fn upgrade(client: &Arc<dyn NodeClient>, config: &Arc<ScrapeConfig>) -> String {
    let registry = Registry::new();
    let mut group = TaskGroup::new();
    if let Some(family) = registered(UpgradeMetrics::register(&registry, config)) {
        tasks::params::collect_upgrade(&mut group, client, &family);
    }
    group.join_all().await;
    metrics::render(&registry)
}

/// Chain-specific probe metrics for one validator address. Requires a
/// configured network; without one there is nothing to probe.
pub async fn oracle(
    client: &Arc<dyn NodeClient>,
    config: &Arc<ScrapeConfig>,
    address: &str,
) -> String {
    let registry = Registry::new();
    let Some(network) = config.network else {
        tracing::error!("no network configured, oracle probes unavailable");
        return metrics::render(&registry);
    };
    let Some(operator) = parse_validator(address, config) else {
        return metrics::render(&registry);
    };
    let mut group = TaskGroup::new();
    if let Some(family) = registered(ProbeMetrics::register(
        &registry,
        config,
        probes::specs_for(network),
    )) {
        probes::collect(&mut group, client, &family, network, operator.as_str());
    }
    group.join_all().await;
    metrics::render(&registry)
}

/// The combined scrape: every family the configuration enables, in one
/// registry, one exposition body.
///
/// Malformed configured addresses are logged and skipped; the rest of
/// the scrape proceeds. The vote family waits on an inner group that
/// produces the active proposal id list, then registers its lookup
/// tasks with the outer group alongside everything else.
pub async fn single(client: &Arc<dyn NodeClient>, config: &Arc<ScrapeConfig>) -> String {
    let registry = Registry::new();
    let mut group = TaskGroup::new();

    if let Some(family) = registered(GeneralMetrics::register(&registry, config)) {
        tasks::general::collect(&mut group, client, &family, config);
    }

    let operators: Vec<ValAddress> = config
        .validators
        .iter()
        .filter_map(|address| parse_validator(address, config))
        .collect();

    if !operators.is_empty()
        && let Some(family) = registered(ValidatorMetrics::register(&registry, config))
    {
        for operator in &operators {
            tasks::validators::collect_one(&mut group, client, &family, config, operator.clone());
        }
    }

    if !config.wallets.is_empty()
        && let Some(family) = registered(WalletMetrics::register(&registry, config))
    {
        for address in &config.wallets {
            if let Some(account) = parse_account(address, config) {
                tasks::wallets::collect_balances(&mut group, client, &family, config, account);
            }
        }
    }

    if config.proposals
        && let Some(family) = registered(ProposalMetrics::register(&registry, config))
    {
        // The combined scrape only lists proposals still in their
        // voting period; the standalone proposals endpoint lists all.
        tasks::proposals::collect(&mut group, client, &family, config, true);
    }

    if config.params
        && let Some(family) = registered(ParamsMetrics::register(&registry, config))
    {
        tasks::params::collect_params(&mut group, client, &family);
    }

    if config.upgrades
        && let Some(family) = registered(UpgradeMetrics::register(&registry, config))
    {
        tasks::params::collect_upgrade(&mut group, client, &family);
    }

    if config.votes
        && !operators.is_empty()
        && let Some(family) = registered(VoteMetrics::register(&registry, config))
    {
        // The vote lookups need the active proposal ids first; the
        // producer runs behind its own barrier while the tasks already
        // in the outer group keep making progress.
        let mut producer: TaskGroup<Vec<u64>> = TaskGroup::new();
        tasks::votes::spawn_active_proposal_producer(&mut producer, client, config);
        let active: Vec<u64> = producer.join_all().await.into_iter().flatten().collect();
        for operator in &operators {
            tasks::votes::collect_votes(&mut group, client, &family, config, operator, &active);
        }
    }

    if let Some(network) = config.network
        && !operators.is_empty()
        && let Some(family) = registered(ProbeMetrics::register(
            &registry,
            config,
            probes::specs_for(network),
        ))
    {
        for operator in &operators {
            probes::collect(&mut group, client, &family, network, operator.as_str());
        }
    }

    group.join_all().await;
    metrics::render(&registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::address;
    use crate::client::{
        ClientError, Coin, Delegation, DenomMetadata, NodeInfo, Paged, ProposalLegacy,
        ProposalV1, StakingParams, StakingPool, Unbonding, UpgradePlan, ValidatorInfo, Vote,
        VoteOption,
    };

    #[derive(Default)]
    struct MockNodeClient {
        /// Methods that answer with a transport error.
        fail: Vec<&'static str>,
        /// Supply pages served in order; empty means one default page.
        supply_pages: Vec<Vec<Coin>>,
        /// Proposal ids in voting period.
        active_proposals: Vec<u64>,
        /// Whether vote lookups find a recorded vote.
        voted: bool,
        calls: Mutex<HashMap<&'static str, usize>>,
    }

    impl MockNodeClient {
        fn enter(&self, method: &'static str) -> Result<(), ClientError> {
            *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
            if self.fail.contains(&method) {
                return Err(ClientError::Transport("mock failure".to_string()));
            }
            Ok(())
        }

        fn count(&self, method: &str) -> usize {
            self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
        }

        fn active_v1(&self) -> Vec<ProposalV1> {
            self.active_proposals
                .iter()
                .map(|&id| ProposalV1 {
                    id,
                    status: "PROPOSAL_STATUS_VOTING_PERIOD".to_string(),
                    metadata: String::new(),
                    voting_start_time: None,
                    voting_end_time: None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl NodeClient for MockNodeClient {
        async fn latest_block_height(&self) -> Result<u64, ClientError> {
            self.enter("latest_block_height")?;
            Ok(4242)
        }

        async fn syncing(&self) -> Result<bool, ClientError> {
            self.enter("syncing")?;
            Ok(false)
        }

        async fn node_info(&self) -> Result<NodeInfo, ClientError> {
            self.enter("node_info")?;
            Ok(NodeInfo {
                network: "mockchain-1".to_string(),
                ..Default::default()
            })
        }

        async fn staking_pool(&self) -> Result<StakingPool, ClientError> {
            self.enter("staking_pool")?;
            Ok(StakingPool {
                bonded_tokens: "1000".to_string(),
                not_bonded_tokens: "50".to_string(),
            })
        }

        async fn community_pool(&self) -> Result<Vec<Coin>, ClientError> {
            self.enter("community_pool")?;
            Ok(vec![Coin {
                denom: "uatom".to_string(),
                amount: "300".to_string(),
            }])
        }

        async fn total_supply(&self, page_key: Option<&str>) -> Result<Paged<Coin>, ClientError> {
            self.enter("total_supply")?;
            if self.supply_pages.is_empty() {
                return Ok(Paged {
                    items: vec![Coin {
                        denom: "uatom".to_string(),
                        amount: "1000".to_string(),
                    }],
                    next_key: None,
                });
            }
            let index: usize = match page_key {
                None => 0,
                Some(key) => key.parse().unwrap(),
            };
            let next = index + 1;
            Ok(Paged {
                items: self.supply_pages[index].clone(),
                next_key: (next < self.supply_pages.len()).then(|| next.to_string()),
            })
        }

        async fn denoms_metadata(&self) -> Result<Vec<DenomMetadata>, ClientError> {
            self.enter("denoms_metadata")?;
            Ok(Vec::new())
        }

        async fn proposals_v1(&self, active_only: bool) -> Result<Vec<ProposalV1>, ClientError> {
            self.enter("proposals_v1")?;
            if !active_only {
                *self
                    .calls
                    .lock()
                    .unwrap()
                    .entry("proposals_v1_all")
                    .or_insert(0) += 1;
            }
            Ok(self.active_v1())
        }

        async fn proposals_legacy(
            &self,
            _active_only: bool,
        ) -> Result<Vec<ProposalLegacy>, ClientError> {
            self.enter("proposals_legacy")?;
            Ok(Vec::new())
        }

        async fn proposal_vote(
            &self,
            _proposal_id: u64,
            _voter: &str,
        ) -> Result<Vote, ClientError> {
            self.enter("proposal_vote")?;
            if !self.voted {
                return Err(ClientError::NotFound);
            }
            Ok(Vote {
                options: vec![VoteOption {
                    option: "VOTE_OPTION_YES".to_string(),
                    weight: "1.0".to_string(),
                }],
            })
        }

        async fn validator(&self, operator: &str) -> Result<ValidatorInfo, ClientError> {
            self.enter("validator")?;
            Ok(ValidatorInfo {
                operator_address: operator.to_string(),
                moniker: "mock-node".to_string(),
                status: "BOND_STATUS_BONDED".to_string(),
                jailed: false,
                tokens: "2000000".to_string(),
                delegator_shares: "2000000".to_string(),
                commission_rate: "0.05".to_string(),
            })
        }

        async fn validators(
            &self,
            _page_key: Option<&str>,
        ) -> Result<Paged<ValidatorInfo>, ClientError> {
            self.enter("validators")?;
            Ok(Paged {
                items: vec![self.validator("mockvaloper1canned").await?],
                next_key: None,
            })
        }

        async fn balances(
            &self,
            _address: &str,
            _page_key: Option<&str>,
        ) -> Result<Paged<Coin>, ClientError> {
            self.enter("balances")?;
            Ok(Paged {
                items: vec![Coin {
                    denom: "uatom".to_string(),
                    amount: "2000000".to_string(),
                }],
                next_key: None,
            })
        }

        async fn delegations(&self, _address: &str) -> Result<Vec<Delegation>, ClientError> {
            self.enter("delegations")?;
            Ok(Vec::new())
        }

        async fn unbonding_delegations(
            &self,
            _address: &str,
        ) -> Result<Vec<Unbonding>, ClientError> {
            self.enter("unbonding_delegations")?;
            Ok(Vec::new())
        }

        async fn staking_params(&self) -> Result<StakingParams, ClientError> {
            self.enter("staking_params")?;
            Ok(StakingParams {
                bond_denom: "uatom".to_string(),
                max_validators: 100,
                unbonding_time_secs: 1_814_400.0,
            })
        }

        async fn upgrade_plan(&self) -> Result<Option<UpgradePlan>, ClientError> {
            self.enter("upgrade_plan")?;
            Ok(None)
        }

        async fn get_json(&self, _path: &str) -> Result<serde_json::Value, ClientError> {
            self.enter("get_json")?;
            Ok(json!({"miss_counter": "5"}))
        }
    }

    fn test_config() -> ScrapeConfig {
        ScrapeConfig {
            chain_id: "mockchain-1".to_string(),
            denom: "atom".to_string(),
            denom_coefficient: 1_000_000.0,
            account_prefix: "mock".to_string(),
            validator_prefix: "mockvaloper".to_string(),
            ..Default::default()
        }
    }

    fn sample_address(prefix: &str) -> String {
        let payload: Vec<u8> = (0u8..32).map(|i| i % 32).collect();
        address::encode(prefix, &payload)
    }

    fn client_of(mock: &Arc<MockNodeClient>) -> Arc<dyn NodeClient> {
        mock.clone()
    }

    #[tokio::test]
    async fn general_scrape_renders_core_metrics() {
        let mock = Arc::new(MockNodeClient::default());
        let client = client_of(&mock);
        let config = Arc::new(test_config());

        let body = general(&client, &config).await;

        assert!(body.contains("cosmos_latest_block_height"));
        assert!(body.contains("cosmos_general_bonded_tokens"));
        assert!(body.contains("chain_id=\"mockchain-1\""));
        assert_eq!(mock.count("latest_block_height"), 1);
    }

    #[tokio::test]
    async fn failed_query_only_drops_its_own_metrics() {
        let mock = Arc::new(MockNodeClient {
            fail: vec!["staking_pool"],
            ..Default::default()
        });
        let client = client_of(&mock);
        let config = Arc::new(test_config());

        let body = general(&client, &config).await;

        // The failing task's gauges keep their registration default
        // while the sibling tasks still record theirs.
        assert!(body.contains("cosmos_general_bonded_tokens{chain_id=\"mockchain-1\"} 0"));
        assert!(body.contains("cosmos_latest_block_height{chain_id=\"mockchain-1\"} 4242"));
    }

    fn supply_line(body: &str) -> &str {
        body.lines()
            .find(|line| line.starts_with("cosmos_general_supply_total{"))
            .expect("supply sample present")
    }

    #[tokio::test]
    async fn supply_sum_is_invariant_under_page_splits() {
        let one_page = Arc::new(MockNodeClient {
            supply_pages: vec![vec![Coin {
                denom: "uatom".to_string(),
                amount: "5000000".to_string(),
            }]],
            ..Default::default()
        });
        let split = Arc::new(MockNodeClient {
            supply_pages: vec![
                vec![Coin {
                    denom: "uatom".to_string(),
                    amount: "2000000".to_string(),
                }],
                vec![Coin {
                    denom: "uatom".to_string(),
                    amount: "3000000".to_string(),
                }],
            ],
            ..Default::default()
        });
        let config = Arc::new(test_config());

        let body_one = general(&client_of(&one_page), &config).await;
        let body_split = general(&client_of(&split), &config).await;

        assert_eq!(supply_line(&body_one), supply_line(&body_split));
        assert_eq!(split.count("total_supply"), 2);
    }

    #[tokio::test]
    async fn invalid_validator_address_yields_empty_body() {
        let mock = Arc::new(MockNodeClient::default());
        let client = client_of(&mock);
        let config = Arc::new(test_config());

        let body = validator(&client, &config, "not-an-address").await;

        assert!(body.is_empty());
        assert_eq!(mock.count("validator"), 0);
    }

    #[tokio::test]
    async fn single_scrape_gates_families_by_flags() {
        let mock = Arc::new(MockNodeClient::default());
        let client = client_of(&mock);
        let config = Arc::new(test_config());

        let body = single(&client, &config).await;

        assert!(body.contains("cosmos_latest_block_height"));
        assert!(!body.contains("cosmos_wallet_balance"));
        assert!(!body.contains("cosmos_validator_tokens"));
        assert!(!body.contains("cosmos_proposals"));
        assert!(!body.contains("cosmos_params_max_validators"));
        assert!(!body.contains("cosmos_upgrade_planned"));
        assert_eq!(mock.count("balances"), 0);
        assert_eq!(mock.count("staking_params"), 0);
        assert_eq!(mock.count("upgrade_plan"), 0);
        assert_eq!(mock.count("proposal_vote"), 0);
    }

    #[tokio::test]
    async fn combined_scrape_lists_only_active_proposals() {
        let mock = Arc::new(MockNodeClient {
            active_proposals: vec![12],
            ..Default::default()
        });
        let client = client_of(&mock);
        let config = Arc::new(ScrapeConfig {
            proposals: true,
            prop_v1: true,
            ..test_config()
        });

        let body = single(&client, &config).await;

        assert!(body.contains("cosmos_proposals"));
        // The general count task and the proposal family both restrict
        // to the voting period; nothing asks for the full history.
        assert_eq!(mock.count("proposals_v1"), 2);
        assert_eq!(mock.count("proposals_v1_all"), 0);
    }

    #[tokio::test]
    async fn proposals_endpoint_lists_full_history() {
        let mock = Arc::new(MockNodeClient {
            active_proposals: vec![12],
            ..Default::default()
        });
        let client = client_of(&mock);
        let config = Arc::new(ScrapeConfig {
            prop_v1: true,
            ..test_config()
        });

        let body = proposals(&client, &config).await;

        assert!(body.contains("cosmos_proposals"));
        assert_eq!(mock.count("proposals_v1_all"), 1);
    }

    #[tokio::test]
    async fn unvoted_validator_emits_not_voted_sample() {
        let mock = Arc::new(MockNodeClient {
            active_proposals: vec![3],
            voted: false,
            ..Default::default()
        });
        let client = client_of(&mock);
        let config = Arc::new(ScrapeConfig {
            validators: vec![sample_address("mockvaloper")],
            votes: true,
            prop_v1: true,
            ..test_config()
        });

        let body = single(&client, &config).await;

        assert!(body.contains("vote_option=\"NOT_VOTED\""));
        assert!(body.contains("proposal_id=\"3\""));
        assert!(body.contains("voted=\"no\""));
        assert_eq!(mock.count("proposal_vote"), 1);
    }

    #[tokio::test]
    async fn recorded_vote_emits_option_and_weight() {
        let mock = Arc::new(MockNodeClient {
            active_proposals: vec![7],
            voted: true,
            ..Default::default()
        });
        let client = client_of(&mock);
        let config = Arc::new(ScrapeConfig {
            validators: vec![sample_address("mockvaloper")],
            votes: true,
            prop_v1: true,
            ..test_config()
        });

        let body = single(&client, &config).await;

        assert!(body.contains("vote_option=\"VOTE_OPTION_YES\""));
        assert!(body.contains("voted=\"yes\""));
        assert!(!body.contains("NOT_VOTED"));
    }

    #[tokio::test]
    async fn invalid_wallet_is_skipped_but_valid_one_is_scraped() {
        let mock = Arc::new(MockNodeClient::default());
        let client = client_of(&mock);
        let valid = sample_address("mock");
        let config = Arc::new(ScrapeConfig {
            wallets: vec![valid.clone(), "garbage".to_string()],
            ..test_config()
        });

        let body = single(&client, &config).await;

        assert!(body.contains(&format!("address=\"{valid}\"")));
        assert_eq!(mock.count("balances"), 1);
    }

    #[tokio::test]
    async fn oracle_without_network_is_empty() {
        let mock = Arc::new(MockNodeClient::default());
        let client = client_of(&mock);
        let config = Arc::new(test_config());

        let body = oracle(&client, &config, &sample_address("mockvaloper")).await;

        assert!(body.is_empty());
        assert_eq!(mock.count("get_json"), 0);
    }
}
