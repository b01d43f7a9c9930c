//! Scrape configuration.
//!
//! [`ScrapeConfig`] is built once at process start (from a JSON file or
//! defaults), resolved against the node (chain id, denom coefficient),
//! and then treated as read-only for the lifetime of the process. Fetch
//! tasks only ever read it.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::client::DenomMetadata;

/// Network identity selecting the chain-specific probe family.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Sei,
    Kujira,
    Injective,
    Initia,
    Pryzm,
}

/// Connection settings for the upstream node.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Base URL of the node's LCD REST endpoint.
    pub lcd_url: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            lcd_url: "http://localhost:1317".to_string(),
            timeout_secs: 10,
        }
    }
}

/// What to scrape, and how to label and scale it.
///
/// Flags must be internally consistent at the call site: `votes` only has
/// an effect when at least one validator address is configured. The
/// orchestrator does not re-validate this.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Display denom used for scaled metrics; resolved from chain
    /// metadata when left empty.
    pub denom: String,
    /// Divisor applied to base-unit amounts (e.g. 1e6 for uatom->atom).
    pub denom_coefficient: f64,
    /// Alternative to the coefficient: power-of-ten exponent.
    pub denom_exponent: u32,
    /// Chain id; queried from the node at startup and attached to every
    /// metric as a const label.
    pub chain_id: String,

    /// Global bech32 prefix; the account/validator prefixes derive from
    /// it when not set explicitly.
    pub prefix: String,
    pub account_prefix: String,
    pub validator_prefix: String,

    /// Wallet addresses served by the wallet family.
    pub wallets: Vec<String>,
    /// Validator operator addresses served by the validator family.
    pub validators: Vec<String>,

    /// Feature flags for the combined scrape.
    pub single: bool,
    pub proposals: bool,
    pub params: bool,
    pub upgrades: bool,
    pub votes: bool,
    /// Use the v1 governance query schema instead of the legacy one.
    pub prop_v1: bool,

    /// Chain-specific probe family to run, if any.
    pub network: Option<Network>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            denom: String::new(),
            denom_coefficient: 1.0,
            denom_exponent: 0,
            chain_id: String::new(),
            prefix: "cosmos".to_string(),
            account_prefix: String::new(),
            validator_prefix: String::new(),
            wallets: Vec::new(),
            validators: Vec::new(),
            single: false,
            proposals: false,
            params: false,
            upgrades: false,
            votes: false,
            prop_v1: false,
            network: None,
        }
    }
}

impl ScrapeConfig {
    /// Labels attached to every instrument of every family.
    pub fn const_labels(&self) -> HashMap<String, String> {
        HashMap::from([("chain_id".to_string(), self.chain_id.clone())])
    }

    /// Fills the account/validator prefixes from the global prefix where
    /// they were not configured explicitly. Some networks (Iris) use
    /// prefixes that do not derive from the account one, hence the
    /// override fields.
    pub fn derive_prefixes(&mut self) {
        if self.account_prefix.is_empty() {
            self.account_prefix = self.prefix.clone();
        }
        if self.validator_prefix.is_empty() {
            self.validator_prefix = format!("{}valoper", self.prefix);
        }
    }

    /// Applies user-supplied denom settings, if complete.
    ///
    /// Returns `true` when the denom and its scale were fully provided by
    /// configuration and no metadata query is needed. Supplying both a
    /// coefficient and an exponent is a configuration error.
    pub fn apply_user_denom(&mut self) -> Result<bool, ConfigError> {
        if self.denom.is_empty() {
            return Ok(false);
        }
        let has_coefficient = self.denom_coefficient != 1.0;
        let has_exponent = self.denom_exponent != 0;
        if has_coefficient && has_exponent {
            return Err(ConfigError::AmbiguousDenomScale);
        }
        if has_exponent {
            self.denom_coefficient = 10f64.powi(self.denom_exponent as i32);
            return Ok(true);
        }
        Ok(has_coefficient)
    }

    /// Resolves the denom and coefficient from chain metadata.
    ///
    /// Uses the first metadata entry, mirroring the node's primary
    /// denom. When no display denom was configured, the metadata's
    /// display unit is adopted.
    pub fn resolve_denom(&mut self, metadatas: &[DenomMetadata]) -> Result<(), ConfigError> {
        let metadata = metadatas.first().ok_or(ConfigError::NoDenomMetadata)?;
        if self.denom.is_empty() {
            self.denom = metadata.display.clone();
        }
        for unit in &metadata.denom_units {
            if unit.denom == self.denom {
                self.denom_coefficient = 10f64.powi(unit.exponent as i32);
                return Ok(());
            }
        }
        Err(ConfigError::DenomUnitNotFound(self.denom.clone()))
    }
}

/// Errors raised while resolving the configuration at startup.
#[derive(Debug)]
pub enum ConfigError {
    /// Both `denom_coefficient` and `denom_exponent` were provided.
    AmbiguousDenomScale,
    /// The chain exposes no denom metadata and none was configured.
    NoDenomMetadata,
    /// The configured display denom has no unit in the chain metadata.
    DenomUnitNotFound(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::AmbiguousDenomScale => {
                write!(f, "denom_coefficient and denom_exponent are both set; provide only one")
            }
            ConfigError::NoDenomMetadata => write!(
                f,
                "no denom metadata on chain; set denom and denom_coefficient manually"
            ),
            ConfigError::DenomUnitNotFound(denom) => {
                write!(f, "denom unit {denom} not found in chain metadata")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
