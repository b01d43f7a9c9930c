//! Governance proposal metrics.
//!
//! Two upstream schemas exist: the v1 query carries a free-text
//! `metadata` field, the legacy (v1beta1) query embeds the title inside
//! an opaque content envelope. Either way the proposal is exposed as one
//! labeled sample whose value is the proposal id.

use std::sync::Arc;

use serde::Deserialize;

use crate::client::NodeClient;
use crate::config::ScrapeConfig;
use crate::metrics::ProposalMetrics;
use crate::tasks::TaskGroup;

#[derive(Deserialize)]
struct ProposalMeta {
    title: String,
}

/// Derives a display title from the v1 free-text metadata field.
///
/// Preference order: a structured JSON payload with a `title`, then a
/// recognizable URI used verbatim, then a synthesized placeholder.
fn title_from_metadata(id: u64, metadata: &str) -> String {
    if metadata.is_empty() {
        tracing::info!(proposal_id = id, "proposal has no metadata");
        return format!("Proposal {id} has no metadata");
    }
    if let Ok(meta) = serde_json::from_str::<ProposalMeta>(metadata) {
        return meta.title;
    }
    if metadata.starts_with("ipfs://")
        || metadata.starts_with("http://")
        || metadata.starts_with("https://")
    {
        return metadata.to_string();
    }
    tracing::error!(proposal_id = id, "could not parse proposal metadata field");
    format!("Proposal {id} has no metadata")
}

/// Extracts the title from a legacy content envelope.
///
/// Upstream networks that migrated schemas may ship envelopes without a
/// title; that decode failure is logged and the proposal keeps an empty
/// title rather than being dropped.
fn title_from_content(id: u64, content: &serde_json::Value) -> String {
    match content.get("title").and_then(|t| t.as_str()) {
        Some(title) => title.to_string(),
        None => {
            tracing::error!(proposal_id = id, "could not parse proposal content");
            String::new()
        }
    }
}

/// Launches the proposal fetch task. With `active_only`, restricts to
/// proposals currently in their voting period.
pub fn collect(
    group: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &ProposalMetrics,
    config: &Arc<ScrapeConfig>,
    active_only: bool,
) {
    let client = client.clone();
    let metrics = metrics.clone();
    let config = config.clone();
    group.spawn(async move {
        if config.prop_v1 {
            tracing::debug!("started querying v1 proposals");
            let proposals = match client.proposals_v1(active_only).await {
                Ok(proposals) => proposals,
                Err(e) => {
                    tracing::error!(error = %e, "could not get proposals");
                    return;
                }
            };
            tracing::debug!(count = proposals.len(), "fetched proposals");
            for proposal in proposals {
                let title = title_from_metadata(proposal.id, &proposal.metadata);
                metrics
                    .proposals
                    .with_label_values(&[
                        &title,
                        &proposal.status,
                        proposal.voting_start_time.as_deref().unwrap_or("nil"),
                        proposal.voting_end_time.as_deref().unwrap_or("nil"),
                    ])
                    .set(proposal.id as f64);
            }
        } else {
            tracing::debug!("started querying v1beta1 proposals");
            let proposals = match client.proposals_legacy(active_only).await {
                Ok(proposals) => proposals,
                Err(e) => {
                    tracing::error!(error = %e, "could not get proposals");
                    return;
                }
            };
            tracing::debug!(count = proposals.len(), "fetched proposals");
            for proposal in proposals {
                let title = title_from_content(proposal.proposal_id, &proposal.content);
                metrics
                    .proposals
                    .with_label_values(&[
                        &title,
                        &proposal.status,
                        &proposal.voting_start_time,
                        &proposal.voting_end_time,
                    ])
                    .set(proposal.proposal_id as f64);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_metadata_title_wins() {
        let title = title_from_metadata(7, r#"{"title": "Increase max validators"}"#);
        assert_eq!(title, "Increase max validators");
    }

    #[test]
    fn uri_metadata_is_used_verbatim() {
        let title = title_from_metadata(7, "ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
        assert!(title.starts_with("ipfs://"));
    }

    #[test]
    fn empty_metadata_synthesizes_placeholder() {
        assert_eq!(title_from_metadata(7, ""), "Proposal 7 has no metadata");
    }

    #[test]
    fn unparseable_metadata_synthesizes_placeholder() {
        assert_eq!(
            title_from_metadata(7, "some freeform note"),
            "Proposal 7 has no metadata"
        );
    }

    #[test]
    fn legacy_content_title_extracted() {
        let content = serde_json::json!({
            "@type": "/cosmos.gov.v1beta1.TextProposal",
            "title": "Signal proposal",
            "description": "..."
        });
        assert_eq!(title_from_content(3, &content), "Signal proposal");
    }

    #[test]
    fn legacy_content_without_title_degrades_to_empty() {
        let content = serde_json::json!({"@type": "/custom.Envelope"});
        assert_eq!(title_from_content(3, &content), "");
    }
}
