//! Record traversal order from the registry status dashboard

use crate::config::settle;
use crate::error::{ReviewError, Result};
use crate::surface::{RegistryChannel, RegistryScript};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Where traversal continues after a given record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAfter {
    /// The record following the given one
    Next { index: usize, record_id: String },
    /// The given record is not in the snapshot; traversal restarts at 0
    NotFound,
    /// The given record is the last one
    Exhausted,
}

/// Locate `record_id` and step past it.
///
/// Position is always derived from the snapshot, never stored, so skipped
/// or removed records cannot shift it.
pub fn next_after(records: &[String], record_id: &str) -> NextAfter {
    match records.iter().position(|r| r == record_id) {
        None => NextAfter::NotFound,
        Some(i) if i + 1 >= records.len() => NextAfter::Exhausted,
        Some(i) => NextAfter::Next {
            index: i + 1,
            record_id: records[i + 1].clone(),
        },
    }
}

/// Index traversal should resume from, or `None` when exhausted.
///
/// No previous record, or one missing from the snapshot, starts at 0.
pub fn resume_index(records: &[String], after: Option<&str>) -> Option<usize> {
    let start = match after.map(|id| next_after(records, id)) {
        None | Some(NextAfter::NotFound) => 0,
        Some(NextAfter::Next { index, .. }) => index,
        Some(NextAfter::Exhausted) => return None,
    };
    (start < records.len()).then_some(start)
}

/// Cached ordered record ids
pub struct DashboardIndex {
    channel: Arc<RegistryChannel>,
    dashboard_url: String,
    settle_ms: u64,
    cache: Mutex<Option<Vec<String>>>,
}

impl DashboardIndex {
    pub fn new(channel: Arc<RegistryChannel>, dashboard_url: impl Into<String>, settle_ms: u64) -> Self {
        Self {
            channel,
            dashboard_url: dashboard_url.into(),
            settle_ms,
            cache: Mutex::new(None),
        }
    }

    /// Cached snapshot, fetched on first use or after invalidation.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut cache = self.cache.lock().await;
        if let Some(records) = cache.as_ref() {
            return Ok(records.clone());
        }

        let records = self.fetch().await?;
        *cache = Some(records.clone());
        Ok(records)
    }

    /// Drop the cached snapshot so the next `list` refetches
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// Invalidate and fetch a fresh snapshot
    pub async fn reload(&self) -> Result<Vec<String>> {
        self.invalidate().await;
        self.list().await
    }

    pub async fn next_after(&self, record_id: &str) -> Result<NextAfter> {
        let records = self.list().await?;
        Ok(next_after(&records, record_id))
    }

    async fn fetch(&self) -> Result<Vec<String>> {
        self.channel
            .run(RegistryScript::Navigate {
                url: self.dashboard_url.clone(),
            })
            .await?;
        settle(self.settle_ms).await;

        let raw = self.channel.run(RegistryScript::DashboardRecords).await?;
        let records: Vec<String> = serde_json::from_str(raw.trim())
            .map_err(|e| ReviewError::Protocol(format!("dashboard payload: {}", e)))?;
        let records: Vec<String> = records
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        info!(records = records.len(), "dashboard loaded");
        debug!(first = records.first().map(String::as_str), "dashboard order");
        Ok(records)
    }
}
