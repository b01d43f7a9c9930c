//! Validator votes on active proposals.
//!
//! This family depends on data produced by another query: the list of
//! proposals currently in their voting period. The producer runs behind
//! an inner barrier (see [`crate::scrape`]); per-(validator, proposal)
//! lookup tasks are only registered with the outer group once the id
//! list is complete.

use std::sync::Arc;

use crate::address::ValAddress;
use crate::client::{ClientError, NodeClient};
use crate::config::ScrapeConfig;
use crate::metrics::VoteMetrics;
use crate::tasks::{TaskGroup, parse_amount};

/// Spawns the active-proposal-id producer into `inner`. On failure the
/// producer yields an empty list; the vote family then has nothing to
/// look up, which is the correct degraded behavior.
pub fn spawn_active_proposal_producer(
    inner: &mut TaskGroup<Vec<u64>>,
    client: &Arc<dyn NodeClient>,
    config: &Arc<ScrapeConfig>,
) {
    let client = client.clone();
    let config = config.clone();
    inner.spawn(async move {
        tracing::debug!("started querying active proposal ids");
        let ids = if config.prop_v1 {
            client
                .proposals_v1(true)
                .await
                .map(|proposals| proposals.into_iter().map(|p| p.id).collect())
        } else {
            client
                .proposals_legacy(true)
                .await
                .map(|proposals| proposals.into_iter().map(|p| p.proposal_id).collect())
        };
        match ids {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "could not get active proposals");
                Vec::new()
            }
        }
    });
}

/// Registers one vote-lookup task per active proposal for `validator`.
///
/// A `NotFound` answer is itself the fact being scraped: it emits a
/// `voted="no", vote_option="NOT_VOTED"` sample instead of dropping the
/// metric.
pub fn collect_votes(
    outer: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &VoteMetrics,
    config: &Arc<ScrapeConfig>,
    validator: &ValAddress,
    proposal_ids: &[u64],
) {
    let voter = validator.to_account(&config.account_prefix);
    for &proposal_id in proposal_ids {
        let client = client.clone();
        let metrics = metrics.clone();
        let validator = validator.clone();
        let voter = voter.clone();
        outer.spawn(async move {
            tracing::debug!(
                validator = validator.as_str(),
                proposal_id,
                "started querying proposal vote"
            );
            let proposal_label = proposal_id.to_string();
            match client.proposal_vote(proposal_id, voter.as_str()).await {
                Ok(vote) => {
                    for option in vote.options {
                        let weight =
                            parse_amount(&option.weight, "vote weight").unwrap_or(1.0);
                        metrics
                            .vote
                            .with_label_values(&[
                                validator.as_str(),
                                &proposal_label,
                                "yes",
                                &option.option,
                            ])
                            .set(weight);
                    }
                }
                Err(ClientError::NotFound) => {
                    metrics
                        .vote
                        .with_label_values(&[
                            validator.as_str(),
                            &proposal_label,
                            "no",
                            "NOT_VOTED",
                        ])
                        .set(0.0);
                }
                Err(e) => tracing::error!(
                    validator = validator.as_str(),
                    proposal_id,
                    error = %e,
                    "could not get proposal vote"
                ),
            }
        });
    }
}
