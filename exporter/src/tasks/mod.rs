//! Concurrent fetch tasks.
//!
//! A fetch task is one unit of work: call the node, transform the
//! response, write into the request's metric families. Tasks are spawned
//! into a [`TaskGroup`] and never propagate failure to siblings; an
//! upstream or decode error is logged and the task's instruments simply
//! stay unset for this request.

pub mod general;
pub mod params;
pub mod probes;
pub mod proposals;
pub mod validators;
pub mod votes;
pub mod wallets;

use std::future::Future;

use tokio::task::JoinSet;

/// Scoped group of spawned fetch tasks.
///
/// Wraps a [`JoinSet`] so that every child spawned into the group is
/// joined before [`TaskGroup::join_all`] returns; nothing outlives its
/// scope. The orchestrator nests groups where one family's output is a
/// prerequisite for another: an inner group produces, is fully drained,
/// and only then are consumer tasks registered with the outer group.
pub struct TaskGroup<T = ()> {
    set: JoinSet<T>,
}

impl<T: Send + 'static> TaskGroup<T> {
    pub fn new() -> Self {
        Self {
            set: JoinSet::new(),
        }
    }

    /// Registers one task with the group.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.set.spawn(task);
    }

    /// Number of tasks currently registered and not yet joined.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Blocks until every spawned task has finished, collecting their
    /// outputs. A panicked task is logged and skipped; its siblings are
    /// unaffected.
    pub async fn join_all(mut self) -> Vec<T> {
        let mut outputs = Vec::with_capacity(self.set.len());
        while let Some(joined) = self.set.join_next().await {
            match joined {
                Ok(output) => outputs.push(output),
                Err(e) => tracing::error!(error = %e, "fetch task panicked"),
            }
        }
        outputs
    }
}

impl<T: Send + 'static> Default for TaskGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses an amount string from the node into a float, logging and
/// returning `None` when it does not parse. Amounts are decimal strings
/// on the wire; values beyond f64 precision are accepted lossily.
pub(crate) fn parse_amount(value: &str, what: &str) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::error!(value, error = %e, "could not parse {what}");
            None
        }
    }
}
