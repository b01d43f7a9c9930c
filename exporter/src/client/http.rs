//! LCD REST implementation of [`NodeClient`].
//!
//! Cosmos-SDK nodes expose their query services over a REST gateway
//! ("LCD"). Numeric fields arrive as decimal strings and are parsed at
//! this boundary; callers never see wire envelopes.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use async_trait::async_trait;

use super::{
    ClientError, Coin, Delegation, DenomMetadata, DenomUnit, NodeClient, NodeInfo, Paged,
    ProposalLegacy, ProposalV1, StakingParams, StakingPool, Unbonding, UpgradePlan,
    ValidatorInfo, Vote, VoteOption,
};

/// HTTP client for a node's LCD endpoint.
///
/// Cheap to clone behind an `Arc`; reqwest pools connections internally,
/// so one instance serves all concurrent fetch tasks.
pub struct HttpNodeClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpNodeClient {
    /// Constructs a client for `base_url`, e.g. `"http://localhost:1317"`
    /// (without a trailing slash).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        // Avoid accidental double slashes.
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                code: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(format!("failed to parse JSON from {url}: {e}")))
    }
}

fn parse_u64(value: &str, what: &str) -> Result<u64, ClientError> {
    value
        .parse::<u64>()
        .map_err(|e| ClientError::Decode(format!("{what} {value:?} is not an integer: {e}")))
}

/// Percent-encodes the characters a base64 page key can carry that are
/// not query-safe.
fn encode_page_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '+' => out.push_str("%2B"),
            '/' => out.push_str("%2F"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------
// Wire envelopes
// ---------------------------

#[derive(Deserialize)]
struct PaginationWire {
    next_key: Option<String>,
}

#[derive(Deserialize)]
struct CoinWire {
    denom: String,
    amount: String,
}

impl From<CoinWire> for Coin {
    fn from(wire: CoinWire) -> Self {
        Coin {
            denom: wire.denom,
            amount: wire.amount,
        }
    }
}

#[derive(Deserialize)]
struct BlockHeaderWire {
    height: String,
}

#[derive(Deserialize)]
struct BlockWire {
    header: BlockHeaderWire,
}

#[derive(Deserialize)]
struct LatestBlockResponse {
    // Newer SDKs return `sdk_block` alongside `block`; prefer it.
    sdk_block: Option<BlockWire>,
    block: Option<BlockWire>,
}

#[derive(Deserialize)]
struct SyncingResponse {
    syncing: bool,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct DefaultNodeInfoWire {
    network: String,
    version: String,
    moniker: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ApplicationVersionWire {
    name: String,
    version: String,
    git_commit: String,
    cosmos_sdk_version: String,
}

#[derive(Deserialize)]
struct NodeInfoResponse {
    default_node_info: DefaultNodeInfoWire,
    application_version: ApplicationVersionWire,
}

#[derive(Deserialize)]
struct StakingPoolWire {
    bonded_tokens: String,
    not_bonded_tokens: String,
}

#[derive(Deserialize)]
struct StakingPoolResponse {
    pool: StakingPoolWire,
}

#[derive(Deserialize)]
struct CommunityPoolResponse {
    pool: Vec<CoinWire>,
}

#[derive(Deserialize)]
struct SupplyResponse {
    supply: Vec<CoinWire>,
    pagination: Option<PaginationWire>,
}

#[derive(Deserialize)]
struct DenomUnitWire {
    denom: String,
    exponent: u32,
}

#[derive(Deserialize)]
struct DenomMetadataWire {
    base: String,
    display: String,
    denom_units: Vec<DenomUnitWire>,
}

#[derive(Deserialize)]
struct DenomsMetadataResponse {
    metadatas: Vec<DenomMetadataWire>,
}

#[derive(Deserialize)]
struct ProposalV1Wire {
    id: String,
    status: String,
    #[serde(default)]
    metadata: String,
    voting_start_time: Option<String>,
    voting_end_time: Option<String>,
}

#[derive(Deserialize)]
struct ProposalsV1Response {
    proposals: Vec<ProposalV1Wire>,
}

#[derive(Deserialize)]
struct ProposalLegacyWire {
    proposal_id: String,
    status: String,
    #[serde(default)]
    content: serde_json::Value,
    #[serde(default)]
    voting_start_time: String,
    #[serde(default)]
    voting_end_time: String,
}

#[derive(Deserialize)]
struct ProposalsLegacyResponse {
    proposals: Vec<ProposalLegacyWire>,
}

#[derive(Deserialize)]
struct VoteOptionWire {
    option: String,
    weight: String,
}

#[derive(Deserialize)]
struct VoteWire {
    #[serde(default)]
    options: Vec<VoteOptionWire>,
}

#[derive(Deserialize)]
struct VoteResponse {
    vote: VoteWire,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ValidatorDescriptionWire {
    moniker: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct CommissionRatesWire {
    rate: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct CommissionWire {
    commission_rates: CommissionRatesWire,
}

#[derive(Deserialize)]
struct ValidatorWire {
    operator_address: String,
    #[serde(default)]
    description: ValidatorDescriptionWire,
    status: String,
    #[serde(default)]
    jailed: bool,
    tokens: String,
    #[serde(default)]
    delegator_shares: String,
    #[serde(default)]
    commission: CommissionWire,
}

impl From<ValidatorWire> for ValidatorInfo {
    fn from(wire: ValidatorWire) -> Self {
        ValidatorInfo {
            operator_address: wire.operator_address,
            moniker: wire.description.moniker,
            status: wire.status,
            jailed: wire.jailed,
            tokens: wire.tokens,
            delegator_shares: wire.delegator_shares,
            commission_rate: wire.commission.commission_rates.rate,
        }
    }
}

#[derive(Deserialize)]
struct ValidatorResponse {
    validator: ValidatorWire,
}

#[derive(Deserialize)]
struct ValidatorsResponse {
    validators: Vec<ValidatorWire>,
    pagination: Option<PaginationWire>,
}

#[derive(Deserialize)]
struct BalancesResponse {
    balances: Vec<CoinWire>,
    pagination: Option<PaginationWire>,
}

#[derive(Deserialize)]
struct DelegationDetailWire {
    validator_address: String,
}

#[derive(Deserialize)]
struct DelegationResponseWire {
    delegation: DelegationDetailWire,
    balance: CoinWire,
}

#[derive(Deserialize)]
struct DelegationsResponse {
    delegation_responses: Vec<DelegationResponseWire>,
}

#[derive(Deserialize)]
struct UnbondingEntryWire {
    balance: String,
}

#[derive(Deserialize)]
struct UnbondingResponseWire {
    validator_address: String,
    entries: Vec<UnbondingEntryWire>,
}

#[derive(Deserialize)]
struct UnbondingDelegationsResponse {
    unbonding_responses: Vec<UnbondingResponseWire>,
}

#[derive(Deserialize)]
struct StakingParamsWire {
    bond_denom: String,
    max_validators: u32,
    /// Duration string, e.g. `"1814400s"`.
    unbonding_time: String,
}

#[derive(Deserialize)]
struct StakingParamsResponse {
    params: StakingParamsWire,
}

#[derive(Deserialize)]
struct UpgradePlanWire {
    name: String,
    height: String,
}

#[derive(Deserialize)]
struct UpgradePlanResponse {
    plan: Option<UpgradePlanWire>,
}

fn parse_duration_secs(value: &str) -> Result<f64, ClientError> {
    value
        .trim_end_matches('s')
        .parse::<f64>()
        .map_err(|e| ClientError::Decode(format!("unbonding time {value:?} is not a duration: {e}")))
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn latest_block_height(&self) -> Result<u64, ClientError> {
        let response: LatestBlockResponse =
            self.get("/cosmos/base/tendermint/v1beta1/blocks/latest").await?;
        let block = response
            .sdk_block
            .or(response.block)
            .ok_or_else(|| ClientError::Decode("latest block response has no block".into()))?;
        parse_u64(&block.header.height, "block height")
    }

    async fn syncing(&self) -> Result<bool, ClientError> {
        let response: SyncingResponse =
            self.get("/cosmos/base/tendermint/v1beta1/syncing").await?;
        Ok(response.syncing)
    }

    async fn node_info(&self) -> Result<NodeInfo, ClientError> {
        let response: NodeInfoResponse =
            self.get("/cosmos/base/tendermint/v1beta1/node_info").await?;
        Ok(NodeInfo {
            network: response.default_node_info.network,
            node_version: response.default_node_info.version,
            moniker: response.default_node_info.moniker,
            app_name: response.application_version.name,
            app_version: response.application_version.version,
            git_commit: response.application_version.git_commit,
            sdk_version: response.application_version.cosmos_sdk_version,
        })
    }

    async fn staking_pool(&self) -> Result<StakingPool, ClientError> {
        let response: StakingPoolResponse = self.get("/cosmos/staking/v1beta1/pool").await?;
        Ok(StakingPool {
            bonded_tokens: response.pool.bonded_tokens,
            not_bonded_tokens: response.pool.not_bonded_tokens,
        })
    }

    async fn community_pool(&self) -> Result<Vec<Coin>, ClientError> {
        let response: CommunityPoolResponse =
            self.get("/cosmos/distribution/v1beta1/community_pool").await?;
        Ok(response.pool.into_iter().map(Coin::from).collect())
    }

    async fn total_supply(&self, page_key: Option<&str>) -> Result<Paged<Coin>, ClientError> {
        let path = match page_key {
            Some(key) => format!(
                "/cosmos/bank/v1beta1/supply?pagination.key={}",
                encode_page_key(key)
            ),
            None => "/cosmos/bank/v1beta1/supply".to_string(),
        };
        let response: SupplyResponse = self.get(&path).await?;
        Ok(Paged {
            items: response.supply.into_iter().map(Coin::from).collect(),
            next_key: response.pagination.and_then(|p| p.next_key).filter(|k| !k.is_empty()),
        })
    }

    async fn denoms_metadata(&self) -> Result<Vec<DenomMetadata>, ClientError> {
        let response: DenomsMetadataResponse =
            self.get("/cosmos/bank/v1beta1/denoms_metadata").await?;
        Ok(response
            .metadatas
            .into_iter()
            .map(|m| DenomMetadata {
                base: m.base,
                display: m.display,
                denom_units: m
                    .denom_units
                    .into_iter()
                    .map(|u| DenomUnit {
                        denom: u.denom,
                        exponent: u.exponent,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn proposals_v1(&self, active_only: bool) -> Result<Vec<ProposalV1>, ClientError> {
        let path = if active_only {
            "/cosmos/gov/v1/proposals?proposal_status=PROPOSAL_STATUS_VOTING_PERIOD&pagination.reverse=true"
        } else {
            "/cosmos/gov/v1/proposals?pagination.reverse=true"
        };
        let response: ProposalsV1Response = self.get(path).await?;
        response
            .proposals
            .into_iter()
            .map(|p| {
                Ok(ProposalV1 {
                    id: parse_u64(&p.id, "proposal id")?,
                    status: p.status,
                    metadata: p.metadata,
                    voting_start_time: p.voting_start_time,
                    voting_end_time: p.voting_end_time,
                })
            })
            .collect()
    }

    async fn proposals_legacy(
        &self,
        active_only: bool,
    ) -> Result<Vec<ProposalLegacy>, ClientError> {
        let path = if active_only {
            "/cosmos/gov/v1beta1/proposals?proposal_status=2&pagination.reverse=true"
        } else {
            "/cosmos/gov/v1beta1/proposals?pagination.reverse=true"
        };
        let response: ProposalsLegacyResponse = self.get(path).await?;
        response
            .proposals
            .into_iter()
            .map(|p| {
                Ok(ProposalLegacy {
                    proposal_id: parse_u64(&p.proposal_id, "proposal id")?,
                    status: p.status,
                    content: p.content,
                    voting_start_time: p.voting_start_time,
                    voting_end_time: p.voting_end_time,
                })
            })
            .collect()
    }

    async fn proposal_vote(&self, proposal_id: u64, voter: &str) -> Result<Vote, ClientError> {
        let path = format!("/cosmos/gov/v1beta1/proposals/{proposal_id}/votes/{voter}");
        let response: VoteResponse = self.get(&path).await?;
        Ok(Vote {
            options: response
                .vote
                .options
                .into_iter()
                .map(|o| VoteOption {
                    option: o.option,
                    weight: o.weight,
                })
                .collect(),
        })
    }

    async fn validator(&self, operator: &str) -> Result<ValidatorInfo, ClientError> {
        let path = format!("/cosmos/staking/v1beta1/validators/{operator}");
        let response: ValidatorResponse = self.get(&path).await?;
        Ok(response.validator.into())
    }

    async fn validators(
        &self,
        page_key: Option<&str>,
    ) -> Result<Paged<ValidatorInfo>, ClientError> {
        let path = match page_key {
            Some(key) => format!(
                "/cosmos/staking/v1beta1/validators?pagination.key={}",
                encode_page_key(key)
            ),
            None => "/cosmos/staking/v1beta1/validators".to_string(),
        };
        let response: ValidatorsResponse = self.get(&path).await?;
        Ok(Paged {
            items: response.validators.into_iter().map(Into::into).collect(),
            next_key: response.pagination.and_then(|p| p.next_key).filter(|k| !k.is_empty()),
        })
    }

    async fn balances(
        &self,
        address: &str,
        page_key: Option<&str>,
    ) -> Result<Paged<Coin>, ClientError> {
        let path = match page_key {
            Some(key) => format!(
                "/cosmos/bank/v1beta1/balances/{address}?pagination.key={}",
                encode_page_key(key)
            ),
            None => format!("/cosmos/bank/v1beta1/balances/{address}"),
        };
        let response: BalancesResponse = self.get(&path).await?;
        Ok(Paged {
            items: response.balances.into_iter().map(Coin::from).collect(),
            next_key: response.pagination.and_then(|p| p.next_key).filter(|k| !k.is_empty()),
        })
    }

    async fn delegations(&self, address: &str) -> Result<Vec<Delegation>, ClientError> {
        let path = format!("/cosmos/staking/v1beta1/delegations/{address}");
        let response: DelegationsResponse = self.get(&path).await?;
        Ok(response
            .delegation_responses
            .into_iter()
            .map(|d| Delegation {
                validator: d.delegation.validator_address,
                balance: d.balance.into(),
            })
            .collect())
    }

    async fn unbonding_delegations(&self, address: &str) -> Result<Vec<Unbonding>, ClientError> {
        let path = format!("/cosmos/staking/v1beta1/delegators/{address}/unbonding_delegations");
        let response: UnbondingDelegationsResponse = self.get(&path).await?;
        Ok(response
            .unbonding_responses
            .into_iter()
            .map(|u| {
                let total: f64 = u
                    .entries
                    .iter()
                    .filter_map(|e| e.balance.parse::<f64>().ok())
                    .sum();
                Unbonding {
                    validator: u.validator_address,
                    balance: total.to_string(),
                }
            })
            .collect())
    }

    async fn staking_params(&self) -> Result<StakingParams, ClientError> {
        let response: StakingParamsResponse =
            self.get("/cosmos/staking/v1beta1/params").await?;
        Ok(StakingParams {
            bond_denom: response.params.bond_denom,
            max_validators: response.params.max_validators,
            unbonding_time_secs: parse_duration_secs(&response.params.unbonding_time)?,
        })
    }

    async fn upgrade_plan(&self) -> Result<Option<UpgradePlan>, ClientError> {
        let response: UpgradePlanResponse =
            self.get("/cosmos/upgrade/v1beta1/current_plan").await?;
        response
            .plan
            .map(|plan| {
                Ok(UpgradePlan {
                    height: parse_u64(&plan.height, "upgrade height")?,
                    name: plan.name,
                })
            })
            .transpose()
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        self.get(path).await
    }
}
