//! Chain parameter and upgrade-plan metrics.

use std::sync::Arc;

use crate::client::NodeClient;
use crate::metrics::{ParamsMetrics, UpgradeMetrics};
use crate::tasks::TaskGroup;

/// Launches the staking-params fetch task.
pub fn collect_params(
    group: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &ParamsMetrics,
) {
    let client = client.clone();
    let metrics = metrics.clone();
    group.spawn(async move {
        tracing::debug!("started querying staking params");
        match client.staking_params().await {
            Ok(params) => {
                metrics.max_validators.set(f64::from(params.max_validators));
                metrics
                    .unbonding_time_seconds
                    .set(params.unbonding_time_secs);
                metrics
                    .bond_denom
                    .with_label_values(&[&params.bond_denom])
                    .set(1.0);
            }
            Err(e) => tracing::error!(error = %e, "could not get staking params"),
        }
    });
}

/// Launches the upgrade-plan fetch task. No scheduled plan is a normal
/// answer, exposed as `planned = 0`.
pub fn collect_upgrade(
    group: &mut TaskGroup,
    client: &Arc<dyn NodeClient>,
    metrics: &UpgradeMetrics,
) {
    let client = client.clone();
    let metrics = metrics.clone();
    group.spawn(async move {
        tracing::debug!("started querying upgrade plan");
        match client.upgrade_plan().await {
            Ok(Some(plan)) => {
                metrics.planned.set(1.0);
                metrics
                    .plan_height
                    .with_label_values(&[&plan.name])
                    .set(plan.height as f64);
            }
            Ok(None) => metrics.planned.set(0.0),
            Err(e) => tracing::error!(error = %e, "could not get upgrade plan"),
        }
    });
}
