//! Background lookup of the next eligible record
//!
//! Started once the coordinator has a patient in front of them; consumed
//! or discarded the next time the engine advances. The task only talks to
//! the registry, whose channel serializes it against the coordinator path.
//! A discarded handle aborts its task, so at most one walk is ever alive.

use super::cursor::{next_eligible, Located};
use crate::registry::{DashboardIndex, RegistrySession};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outcome of a prefetch, tagged with the record it was started after
#[derive(Debug)]
pub enum PrefetchResult {
    Ready { after: String, located: Located },
    NoMore { after: String },
    Failed { after: String, error: String },
}

impl PrefetchResult {
    pub fn after(&self) -> &str {
        match self {
            PrefetchResult::Ready { after, .. }
            | PrefetchResult::NoMore { after }
            | PrefetchResult::Failed { after, .. } => after,
        }
    }

    /// The located record, if this result is ready and was started after `expected`
    pub fn ready_for(self, expected: &str) -> Option<Located> {
        match self {
            PrefetchResult::Ready { after, located } if after == expected => Some(located),
            _ => None,
        }
    }
}

/// A running prefetch and the identifier it was started after
pub struct PrefetchHandle {
    after: String,
    task: JoinHandle<PrefetchResult>,
}

impl PrefetchHandle {
    /// Start walking the dashboard after `after`
    pub fn spawn(registry: Arc<RegistrySession>, dashboard: Arc<DashboardIndex>, after: String) -> Self {
        let tag = after.clone();
        Self::spawn_task(after, async move {
            let records = match dashboard.list().await {
                Ok(r) => r,
                Err(e) => {
                    return PrefetchResult::Failed {
                        after: tag,
                        error: e.to_string(),
                    }
                }
            };
            match next_eligible(&registry, &records, Some(&tag)).await {
                Ok(Some(located)) => {
                    debug!(after = %tag, next = located.patient.record_id(), "prefetch ready");
                    PrefetchResult::Ready { after: tag, located }
                }
                Ok(None) => PrefetchResult::NoMore { after: tag },
                Err(e) => PrefetchResult::Failed {
                    after: tag,
                    error: e.to_string(),
                },
            }
        })
    }

    /// Wrap an arbitrary lookup future
    pub fn spawn_task<F>(after: String, lookup: F) -> Self
    where
        F: Future<Output = PrefetchResult> + Send + 'static,
    {
        Self {
            after,
            task: tokio::spawn(lookup),
        }
    }

    pub fn after(&self) -> &str {
        &self.after
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Consume the result if it is finished and was started after `last`.
    ///
    /// Otherwise the handle is dropped and the task aborted. Abort cancels
    /// the lookup at its next await, which releases any registry lock it
    /// holds.
    pub async fn take(mut self, last: &str) -> Option<PrefetchResult> {
        if self.after != last {
            debug!(after = %self.after, last, "stale prefetch discarded");
            return None;
        }
        if !self.task.is_finished() {
            debug!(after = %self.after, "prefetch still running, using synchronous path");
            return None;
        }
        match (&mut self.task).await {
            Ok(result) if result.after() == last => Some(result),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "prefetch task failed");
                None
            }
        }
    }
}

impl Drop for PrefetchHandle {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            debug!(after = %self.after, "prefetch aborted");
        }
        self.task.abort();
    }
}
