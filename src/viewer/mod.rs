//! Imaging viewer driving: search, study selection, export, navigation
//!
//! All calls are strictly ordered on the coordinator path. Where the viewer
//! exposes an observable condition (row count, list visibility) we poll or
//! verify it; elsewhere a configured settle delay stands in.

mod export;
mod search;
mod select;

pub use export::{rename_latest_download, RenameOutcome};
pub use search::{FieldSet, SearchOutcome};
pub use select::{to_screen, RowGeometry};

use crate::config::{settle, TimingConfig};
use crate::error::{ReviewError, Result};
use crate::surface::{ViewerChannel, ViewerScript};
use serde::Deserialize;
use tracing::{info, warn};

pub struct Viewer {
    channel: ViewerChannel,
    timing: TimingConfig,
}

/// Result of returning to the study list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub list_visible: bool,
    pub filter_row_visible: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ListVisibility {
    treelist_visible: bool,
    filter_row_visible: bool,
}

/// Fail with a protocol error when a script answered `{"error": "..."}`
pub(crate) fn check_error(step: &str, value: &serde_json::Value) -> Result<()> {
    match value.get("error").and_then(|e| e.as_str()) {
        Some(msg) => Err(ReviewError::Protocol(format!("{}: {}", step, msg))),
        None => Ok(()),
    }
}

impl Viewer {
    pub fn new(channel: ViewerChannel, timing: TimingConfig) -> Self {
        Self { channel, timing }
    }

    /// Bring the viewer forward; failures only warn
    pub async fn activate(&self) {
        if let Err(e) = self.channel.activate().await {
            warn!(error = %e, "could not activate viewer");
        }
    }

    /// Hand focus back to the coordinator's terminal; failures only warn
    pub async fn focus_terminal(&self) {
        if let Err(e) = self.channel.focus_terminal().await {
            warn!(error = %e, "could not focus terminal");
        }
    }

    /// Go back to the study list and check it is showing again.
    ///
    /// An invisible list afterwards is reported, not raised.
    pub async fn return_to_list(&self) -> Result<ReturnOutcome> {
        self.activate().await;

        let result = self.channel.run_json(ViewerScript::ReturnToList).await?;
        check_error("return to list", &result)?;

        settle(self.timing.return_settle_ms).await;

        let raw = self.channel.run(ViewerScript::ListVisibility).await?;
        let visibility: ListVisibility = serde_json::from_str(raw.trim()).unwrap_or_default();

        if visibility.treelist_visible {
            info!("returned to study list");
        } else {
            warn!("study list not visible after return; may need manual check");
        }

        Ok(ReturnOutcome {
            list_visible: visibility.treelist_visible,
            filter_row_visible: visibility.filter_row_visible,
        })
    }
}
