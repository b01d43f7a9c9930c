//! Upstream node query client.
//!
//! [`NodeClient`] is the seam between the aggregation engine and the
//! remote node: one async method per logical query, each returning a
//! typed result or a [`ClientError`]. The trait object is shared
//! read-only across every fetch task of every request, so implementations
//! must be safe for concurrent use. [`HttpNodeClient`] talks to the
//! node's LCD REST endpoint.

pub mod http;

use std::fmt;

use async_trait::async_trait;

pub use http::HttpNodeClient;

/// An amount of some denom, as an undecoded decimal string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// One page of a cursor-paginated query.
#[derive(Clone, Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    /// Continuation token; `None` signals the last page.
    pub next_key: Option<String>,
}

/// Version and identity facts reported by the node.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
    pub network: String,
    pub node_version: String,
    pub moniker: String,
    pub app_name: String,
    pub app_version: String,
    pub git_commit: String,
    pub sdk_version: String,
}

#[derive(Clone, Debug)]
pub struct StakingPool {
    pub bonded_tokens: String,
    pub not_bonded_tokens: String,
}

#[derive(Clone, Debug)]
pub struct DenomUnit {
    pub denom: String,
    pub exponent: u32,
}

#[derive(Clone, Debug)]
pub struct DenomMetadata {
    pub base: String,
    pub display: String,
    pub denom_units: Vec<DenomUnit>,
}

/// Governance proposal under the v1 query schema.
#[derive(Clone, Debug)]
pub struct ProposalV1 {
    pub id: u64,
    pub status: String,
    /// Free-text metadata field; may hold JSON, a URI, or nothing.
    pub metadata: String,
    pub voting_start_time: Option<String>,
    pub voting_end_time: Option<String>,
}

/// Governance proposal under the legacy (v1beta1) query schema.
#[derive(Clone, Debug)]
pub struct ProposalLegacy {
    pub proposal_id: u64,
    pub status: String,
    /// Opaque content envelope; a text proposal carries `title` inside.
    pub content: serde_json::Value,
    pub voting_start_time: String,
    pub voting_end_time: String,
}

#[derive(Clone, Debug)]
pub struct VoteOption {
    pub option: String,
    pub weight: String,
}

/// A recorded governance vote.
#[derive(Clone, Debug)]
pub struct Vote {
    pub options: Vec<VoteOption>,
}

#[derive(Clone, Debug)]
pub struct ValidatorInfo {
    pub operator_address: String,
    pub moniker: String,
    pub status: String,
    pub jailed: bool,
    pub tokens: String,
    pub delegator_shares: String,
    pub commission_rate: String,
}

#[derive(Clone, Debug)]
pub struct Delegation {
    pub validator: String,
    pub balance: Coin,
}

#[derive(Clone, Debug)]
pub struct Unbonding {
    pub validator: String,
    /// Sum of this validator's unbonding entry balances, base units.
    pub balance: String,
}

#[derive(Clone, Debug)]
pub struct StakingParams {
    pub bond_denom: String,
    pub max_validators: u32,
    pub unbonding_time_secs: f64,
}

#[derive(Clone, Debug)]
pub struct UpgradePlan {
    pub name: String,
    pub height: u64,
}

/// Failure classes for upstream queries.
#[derive(Debug)]
pub enum ClientError {
    /// The node was unreachable or the connection failed mid-flight.
    Transport(String),
    /// The node answered with a non-success status.
    Status { code: u16, body: String },
    /// The response body did not match the expected shape.
    Decode(String),
    /// The queried entity does not exist. For vote lookups this is a
    /// meaningful result ("has not voted"), not an error to absorb.
    NotFound,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(msg) => write!(f, "transport error: {msg}"),
            ClientError::Status { code, body } => {
                write!(f, "node returned HTTP status {code}: {body}")
            }
            ClientError::Decode(msg) => write!(f, "decode error: {msg}"),
            ClientError::NotFound => write!(f, "not found"),
        }
    }
}

impl std::error::Error for ClientError {}

/// One logical query per method; all safe for concurrent invocation.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn latest_block_height(&self) -> Result<u64, ClientError>;
    async fn syncing(&self) -> Result<bool, ClientError>;
    async fn node_info(&self) -> Result<NodeInfo, ClientError>;
    async fn staking_pool(&self) -> Result<StakingPool, ClientError>;
    async fn community_pool(&self) -> Result<Vec<Coin>, ClientError>;
    /// Cursor-paginated; pass the previous page's `next_key` to continue.
    async fn total_supply(&self, page_key: Option<&str>) -> Result<Paged<Coin>, ClientError>;
    async fn denoms_metadata(&self) -> Result<Vec<DenomMetadata>, ClientError>;
    async fn proposals_v1(&self, active_only: bool) -> Result<Vec<ProposalV1>, ClientError>;
    async fn proposals_legacy(&self, active_only: bool)
    -> Result<Vec<ProposalLegacy>, ClientError>;
    /// Returns [`ClientError::NotFound`] when the voter has no vote
    /// recorded on the proposal.
    async fn proposal_vote(&self, proposal_id: u64, voter: &str) -> Result<Vote, ClientError>;
    async fn validator(&self, operator: &str) -> Result<ValidatorInfo, ClientError>;
    async fn validators(&self, page_key: Option<&str>)
    -> Result<Paged<ValidatorInfo>, ClientError>;
    async fn balances(
        &self,
        address: &str,
        page_key: Option<&str>,
    ) -> Result<Paged<Coin>, ClientError>;
    async fn delegations(&self, address: &str) -> Result<Vec<Delegation>, ClientError>;
    async fn unbonding_delegations(&self, address: &str) -> Result<Vec<Unbonding>, ClientError>;
    async fn staking_params(&self) -> Result<StakingParams, ClientError>;
    async fn upgrade_plan(&self) -> Result<Option<UpgradePlan>, ClientError>;
    /// Raw JSON fetch for chain-specific probe endpoints.
    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ClientError>;
}
