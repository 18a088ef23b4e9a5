//! Automation surface contract
//!
//! Everything that acts inside the two external applications goes through
//! [`AutomationSurface`]. Scripts are typed requests; the payload that runs
//! in the browser tab belongs to the surface implementation, not to the
//! engine. Every `execute` returns the raw string result which callers parse
//! as JSON.

mod bridge;
mod channel;

pub use bridge::BridgeSurface;
pub use channel::{RegistryChannel, ViewerChannel};

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Logical surface a script runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Registry,
    Viewer,
}

/// Application that can be brought to the front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Application {
    Registry,
    Viewer,
    Terminal,
}

/// Requests against the registry tab's authenticated session
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "script", rename_all = "snake_case")]
pub enum RegistryScript {
    /// Point the tab at a page
    Navigate { url: String },
    /// Same-origin GET → `{"status": u16, "body": "..."}`
    HttpGet { path: String },
    /// Same-origin form POST → `{"status": u16}`
    HttpPost { path: String, body: String },
    /// Record ids from the status dashboard table → `["1", "2", ...]`
    DashboardRecords,
}

impl RegistryScript {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryScript::Navigate { .. } => "navigate",
            RegistryScript::HttpGet { .. } => "http_get",
            RegistryScript::HttpPost { .. } => "http_post",
            RegistryScript::DashboardRecords => "dashboard_records",
        }
    }
}

/// Search filter field in the viewer's study list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    PatientId,
    Date,
}

/// Requests against the viewer tab
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "script", rename_all = "snake_case")]
pub enum ViewerScript {
    /// Set a filter value and trigger evaluation → `ok | not_found | no_filter_row | no_date_input`
    SetSearchField { field: SearchField, value: String },
    /// Number of full-width result rows → integer
    CountStudyRows,
    /// `{"rows": [{description, modality, images, accession, expanded}]}`
    ReadStudyRows,
    /// Click the first group toggle → `{"status": "expanded"}` or `{"error": ...}`
    ExpandFirstRow,
    /// Viewport position of a row plus window geometry
    LocateRow { index: usize },
    /// Open save menu and pick Export → `{"status": ...}` or `{"error": ...}`
    OpenExportMenu,
    /// Press Download in the export panel → `{"status": ...}` or `{"error": ...}`
    ClickDownload,
    /// Activate the study-list button → `{"status": ...}` or `{"error": ...}`
    ReturnToList,
    /// `{"treelist_visible": bool, "filter_row_visible": bool}`
    ListVisibility,
}

impl ViewerScript {
    pub fn name(&self) -> &'static str {
        match self {
            ViewerScript::SetSearchField { .. } => "set_search_field",
            ViewerScript::CountStudyRows => "count_study_rows",
            ViewerScript::ReadStudyRows => "read_study_rows",
            ViewerScript::ExpandFirstRow => "expand_first_row",
            ViewerScript::LocateRow { .. } => "locate_row",
            ViewerScript::OpenExportMenu => "open_export_menu",
            ViewerScript::ClickDownload => "click_download",
            ViewerScript::ReturnToList => "return_to_list",
            ViewerScript::ListVisibility => "list_visibility",
        }
    }
}

// Debug shows only the script name: parameters may carry identifying values.
impl std::fmt::Debug for RegistryScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RegistryScript({})", self.name())
    }
}

impl std::fmt::Debug for ViewerScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ViewerScript({})", self.name())
    }
}

/// A typed script bound to its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    Registry(RegistryScript),
    Viewer(ViewerScript),
}

impl Script {
    pub fn target(&self) -> Target {
        match self {
            Script::Registry(_) => Target::Registry,
            Script::Viewer(_) => Target::Viewer,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Script::Registry(s) => s.name(),
            Script::Viewer(s) => s.name(),
        }
    }
}

/// Execution surface for scripts and OS-level pointer actions.
///
/// `execute` is synchronous from the caller's point of view: it resolves
/// once the script has produced its result or the timeout elapsed.
#[async_trait]
pub trait AutomationSurface: Send + Sync {
    async fn execute(&self, script: Script, timeout: Duration) -> Result<String>;

    /// Double-click at absolute screen coordinates
    async fn double_click(&self, x: i32, y: i32) -> Result<()>;

    async fn bring_to_front(&self, app: Application) -> Result<()>;
}
