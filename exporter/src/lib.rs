//! Scrape engine for Cosmos SDK chain metrics.
//!
//! This crate turns one HTTP scrape request into a fan-out of concurrent
//! node queries and one Prometheus text exposition body:
//!
//! - validated bech32 address types (`address`),
//! - the weighted oracle ballot tally (`ballot`),
//! - resolved scrape configuration (`config`),
//! - the typed upstream node client (`client`),
//! - per-request metric families (`metrics`),
//! - concurrent fetch tasks and their task group (`tasks`),
//! - and the request orchestrator tying them together (`scrape`).
//!
//! The gateway binary composes these pieces into the exporter's HTTP
//! endpoints.

pub mod address;
pub mod ballot;
pub mod client;
pub mod config;
pub mod metrics;
pub mod scrape;
pub mod tasks;

// Re-export the address types used at the API boundary.
pub use address::{AccAddress, AddressError, ValAddress};

// Re-export the ballot tally types.
pub use ballot::{Ballot, Claim, VoteForTally};

// Re-export the client seam and its HTTP implementation.
pub use client::{ClientError, HttpNodeClient, NodeClient};

// Re-export configuration types.
pub use config::{ConfigError, Network, NodeConfig, ScrapeConfig};

// Re-export the exposition helpers handlers need.
pub use metrics::{EXPOSITION_CONTENT_TYPE, render};

// Re-export the task group for callers composing their own scrapes.
pub use tasks::TaskGroup;
