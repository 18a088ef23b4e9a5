//! Review workflow state machine
//!
//! One engine owns the patient under review (a single slot, never shared
//! globally), drives the viewer on the coordinator path and hands the
//! registry walk for the following record to a background prefetch.

mod cursor;
mod prefetch;

pub use cursor::{next_eligible, Located};
pub use prefetch::{PrefetchHandle, PrefetchResult};

use crate::config::{Config, DownloadConfig};
use crate::error::{ReviewError, Result};
use crate::patient::PatientContext;
use crate::registry::{DashboardIndex, RegistrySession, SaveOutcome};
use crate::surface::{AutomationSurface, RegistryChannel, ViewerChannel};
use crate::viewer::{rename_latest_download, RenameOutcome, ReturnOutcome, Viewer};
use femoral_review_common::{ImageType, SelectionShorthand, StudyChoice};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Loaded,
    Searching,
    Selected,
    NotFound,
    AwaitingClassification,
    Exporting,
    Saving,
    Returned,
    Exhausted,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::Loaded => "loaded",
            EngineState::Searching => "searching",
            EngineState::Selected => "selected",
            EngineState::NotFound => "not_found",
            EngineState::AwaitingClassification => "awaiting_classification",
            EngineState::Exporting => "exporting",
            EngineState::Saving => "saving",
            EngineState::Returned => "returned",
            EngineState::Exhausted => "exhausted",
        };
        write!(f, "{}", name)
    }
}

/// Operator-facing status for the patient now in front of the coordinator
#[derive(Debug, Clone)]
pub struct PatientReady {
    pub record_id: String,
    pub position: String,
    pub prefetched: bool,
    pub study: Option<StudyChoice>,
    /// Lookup error when no study could be selected
    pub error: Option<String>,
}

/// Where the engine landed after loading a record
#[derive(Debug, Clone)]
pub enum Step {
    /// A study is open and classification is awaited
    Ready(PatientReady),
    /// Search or selection failed; the coordinator handles it manually
    NotFound(PatientReady),
    Exhausted { reason: String },
}

/// Side effects of one accepted classification
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub selection: SelectionShorthand,
    pub exported: bool,
    pub rename: Option<RenameOutcome>,
    pub returned: Option<ReturnOutcome>,
    pub save: SaveOutcome,
}

pub struct WorkflowEngine {
    registry: Arc<RegistrySession>,
    dashboard: Arc<DashboardIndex>,
    viewer: Viewer,
    downloads: DownloadConfig,
    state: EngineState,
    current: Option<PatientContext>,
    last_saved: Option<String>,
    prefetch: Option<PrefetchHandle>,
}

impl WorkflowEngine {
    pub fn new(surface: Arc<dyn AutomationSurface>, config: &Config) -> Self {
        let timeout = Duration::from_secs(config.bridge.timeout_seconds);
        let registry_channel = Arc::new(RegistryChannel::new(surface.clone(), timeout));
        let viewer_channel = ViewerChannel::new(surface, timeout);

        Self {
            registry: Arc::new(RegistrySession::new(
                registry_channel.clone(),
                config.registry.clone(),
            )),
            dashboard: Arc::new(DashboardIndex::new(
                registry_channel,
                config.registry.dashboard_url.clone(),
                config.timing.dashboard_settle_ms,
            )),
            viewer: Viewer::new(viewer_channel, config.timing.clone()),
            downloads: config.downloads.clone(),
            state: EngineState::Idle,
            current: None,
            last_saved: None,
            prefetch: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn current(&self) -> Option<&PatientContext> {
        self.current.as_ref()
    }

    pub fn last_saved(&self) -> Option<&str> {
        self.last_saved.as_deref()
    }

    pub fn prefetch_finished(&self) -> bool {
        self.prefetch.as_ref().is_some_and(|h| h.is_finished())
    }

    /// Begin traversal after `after` (or from the first record)
    pub async fn start(&mut self, after: Option<String>) -> Result<Step> {
        self.last_saved = after;
        self.prefetch = None;
        self.load_synchronous().await
    }

    /// Move past the last saved record, preferring a matching prefetch
    pub async fn advance(&mut self) -> Result<Step> {
        let last = self
            .last_saved
            .clone()
            .ok_or_else(|| ReviewError::Protocol("nothing saved yet to advance from".into()))?;

        if let Some(handle) = self.prefetch.take() {
            if let Some(located) = handle.take(&last).await.and_then(|r| r.ready_for(&last)) {
                info!(record_id = located.patient.record_id(), "using prefetched record");
                return Ok(self.prepare(located, true).await);
            }
        }

        self.load_synchronous().await
    }

    /// Re-run from the last saved record, discarding any prefetch
    pub async fn redo(&mut self) -> Result<Step> {
        self.prefetch = None;
        self.load_synchronous().await
    }

    async fn load_synchronous(&mut self) -> Result<Step> {
        self.state = EngineState::Idle;
        self.current = None;

        let records = self.dashboard.reload().await?;
        let after = self.last_saved.clone();

        match next_eligible(&self.registry, &records, after.as_deref()).await? {
            Some(located) => Ok(self.prepare(located, false).await),
            None => {
                self.state = EngineState::Exhausted;
                let reason = match (&after, records.is_empty()) {
                    (_, true) => "no records on the dashboard".to_string(),
                    (Some(id), false) => format!("no eligible records after {}", id),
                    (None, false) => "no eligible records".to_string(),
                };
                info!(reason = %reason, "traversal exhausted");
                Ok(Step::Exhausted { reason })
            }
        }
    }

    /// Search, select and open the study for a located record, then start
    /// the prefetch and hand control to the coordinator.
    async fn prepare(&mut self, located: Located, prefetched: bool) -> Step {
        let position = located.position();
        let mut patient = located.patient;
        let record_id = patient.record_id().to_string();
        self.state = EngineState::Loaded;
        info!(record_id = %record_id, position = %position, prefetched, "record loaded");
        debug!(patient = ?patient.summary(), "patient fields");

        if let Err(e) = self.viewer.return_to_list().await {
            warn!(error = %e, "return to list before search failed");
        }

        self.state = EngineState::Searching;
        let selected = self.find_study(&patient).await;

        let step = match selected {
            Ok(choice) => {
                patient.set_accession(choice.accession.clone());
                self.state = EngineState::Selected;
                Step::Ready(PatientReady {
                    record_id: record_id.clone(),
                    position,
                    prefetched,
                    study: Some(choice),
                    error: None,
                })
            }
            Err(e) => {
                warn!(record_id = %record_id, kind = e.kind(), error = %e, "study not found");
                self.state = EngineState::NotFound;
                Step::NotFound(PatientReady {
                    record_id: record_id.clone(),
                    position,
                    prefetched,
                    study: None,
                    error: Some(e.to_string()),
                })
            }
        };

        self.current = Some(patient);
        if self.state == EngineState::Selected {
            self.state = EngineState::AwaitingClassification;
        }
        self.prefetch = Some(PrefetchHandle::spawn(
            self.registry.clone(),
            self.dashboard.clone(),
            record_id,
        ));
        self.viewer.focus_terminal().await;
        step
    }

    async fn find_study(&self, patient: &PatientContext) -> Result<StudyChoice> {
        self.viewer.search(patient).await?;
        let choice = self.viewer.choose_study().await?;
        self.viewer.open_study(choice.index).await?;
        Ok(choice)
    }

    /// Apply the coordinator's classification to the current record.
    ///
    /// Invalid input is rejected before any side effect; the engine stays
    /// where it was.
    pub async fn submit(&mut self, line: &str) -> Result<SubmitOutcome> {
        if !matches!(
            self.state,
            EngineState::AwaitingClassification | EngineState::NotFound
        ) {
            return Err(ReviewError::Protocol(format!(
                "no record awaiting classification (state {})",
                self.state
            )));
        }
        let selection = SelectionShorthand::parse(line)?;

        let awaiting = self.state;
        let Some(mut patient) = self.current.take() else {
            return Err(ReviewError::Protocol("no current record".into()));
        };
        let result = self.apply(&mut patient, &selection).await;
        self.current = Some(patient);

        match result {
            Ok(outcome) => {
                self.last_saved = Some(outcome.save.record_id.clone());
                self.state = EngineState::Returned;
                Ok(outcome)
            }
            Err(e) => {
                self.state = awaiting;
                Err(e)
            }
        }
    }

    async fn apply(
        &mut self,
        patient: &mut PatientContext,
        selection: &SelectionShorthand,
    ) -> Result<SubmitOutcome> {
        let record_id = patient.record_id().to_string();

        let mut exported = false;
        let mut rename = None;
        if selection.has(ImageType::Angiogram) {
            self.state = EngineState::Exporting;
            match self.viewer.export_download().await {
                Ok(()) => {
                    exported = true;
                    rename = Some(rename_latest_download(
                        &self.downloads.directory,
                        &self.downloads.artifact_prefix,
                        &record_id,
                    ));
                }
                Err(e) => warn!(record_id = %record_id, error = %e, "export failed"),
            }
        }

        self.state = EngineState::Saving;
        let returned = match self.viewer.return_to_list().await {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = %e, "return to list failed");
                None
            }
        };

        // the view may have reset since selection
        patient.clear_accession();
        match self.viewer.choose_study().await {
            Ok(choice) => patient.set_accession(choice.accession),
            Err(e) => warn!(
                record_id = %record_id,
                error = %e,
                "accession re-extraction failed, saving without it"
            ),
        }
        let accession = patient.accession().unwrap_or_default().to_string();

        let save = self.registry.save(&record_id, &accession, selection).await?;

        Ok(SubmitOutcome {
            selection: selection.clone(),
            exported,
            rename,
            returned,
            save,
        })
    }
}
