//! Two-stage study search: patient identifier, then procedure date

use super::Viewer;
use crate::config::settle;
use crate::error::{ReviewError, Result};
use crate::patient::PatientContext;
use crate::surface::{SearchField, ViewerScript};
use tracing::{debug, info, warn};

/// Result of setting one search filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSet {
    Ok,
    NotFound,
    /// The filter row or its input is missing; carries the viewer's reason
    NoInputFound(String),
}

impl FieldSet {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().trim_matches('"') {
            "ok" => FieldSet::Ok,
            "not_found" => FieldSet::NotFound,
            other => FieldSet::NoInputFound(other.to_string()),
        }
    }

    fn reason(&self) -> &str {
        match self {
            FieldSet::Ok => "ok",
            FieldSet::NotFound => "not_found",
            FieldSet::NoInputFound(reason) => reason,
        }
    }
}

/// Search summary; lengths only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub id_len: usize,
    pub date_len: usize,
    /// Rows appeared before the poll budget ran out
    pub rows_loaded: bool,
}

impl Viewer {
    async fn set_field(&self, field: SearchField, value: &str) -> Result<FieldSet> {
        let raw = self
            .channel
            .run(ViewerScript::SetSearchField {
                field,
                value: value.to_string(),
            })
            .await?;
        Ok(FieldSet::parse(&raw))
    }

    /// Number of full-width study rows currently listed
    pub async fn count_study_rows(&self) -> Result<usize> {
        let raw = self.channel.run(ViewerScript::CountStudyRows).await?;
        let count: f64 = raw
            .trim()
            .parse()
            .map_err(|_| ReviewError::Protocol("row count was not a number".into()))?;
        Ok(count.max(0.0) as usize)
    }

    /// Poll until at least one row shows or the budget runs out
    async fn wait_for_rows(&self) -> bool {
        for attempt in 1..=self.timing.search_poll_attempts {
            settle(self.timing.search_poll_interval_ms).await;
            match self.count_study_rows().await {
                Ok(n) if n > 0 => return true,
                Ok(_) => debug!(attempt, "no study rows yet"),
                Err(e) => debug!(attempt, error = %e, "row count failed"),
            }
        }
        false
    }

    /// Filter the study list down to the patient's procedure.
    ///
    /// A poll timeout after the identifier stage is not fatal: the date stage
    /// still runs and selection fails downstream if nothing shows.
    pub async fn search(&self, patient: &PatientContext) -> Result<SearchOutcome> {
        let record_id = patient.record_id();
        self.activate().await;

        let id_result = self.set_field(SearchField::PatientId, patient.mrn()).await?;
        if id_result != FieldSet::Ok {
            return Err(ReviewError::Protocol(format!(
                "patient identifier field: {}",
                id_result.reason()
            )));
        }

        let rows_loaded = self.wait_for_rows().await;
        if !rows_loaded {
            let waited_ms = self.timing.search_poll_interval_ms * self.timing.search_poll_attempts as u64;
            warn!(record_id, waited_ms, "no study rows after identifier search");
        }

        let date_result = self
            .set_field(SearchField::Date, patient.proc_date_viewer())
            .await?;
        if date_result != FieldSet::Ok {
            return Err(ReviewError::Protocol(format!(
                "date field: {}",
                date_result.reason()
            )));
        }

        let outcome = SearchOutcome {
            id_len: patient.mrn().len(),
            date_len: patient.proc_date_viewer().len(),
            rows_loaded,
        };
        info!(
            record_id,
            id_len = outcome.id_len,
            date_len = outcome.date_len,
            "viewer search set"
        );
        Ok(outcome)
    }
}
