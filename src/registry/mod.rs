//! Registry session: patient field lookup and classification write-back

pub mod dashboard;
pub mod form;

pub use dashboard::{DashboardIndex, NextAfter};

use crate::config::RegistryConfig;
use crate::error::{ReviewError, Result};
use crate::patient::PatientContext;
use crate::surface::{RegistryChannel, RegistryScript};
use femoral_review_common::{registry_to_viewer, ImageType, SelectionShorthand};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Fields rewritten on every save; never carried over from the read form
pub const SAVE_EXCLUDED_FIELDS: &[&str] = &[
    "image_needle_saved",
    "access_angio_saved",
    "image_other_ind_saved",
    "incl_excl_comments",
    "accession_number",
    "needle_series_num",
    "needle_image_number",
    "angio_series_number",
    "angio_image_number",
    "other_ind_series_number",
    "other_ind_image_number",
];

/// Registry field names attached to one image type
struct TypeFields {
    flag: &'static str,
    series: &'static str,
    image: &'static str,
    measurement: &'static str,
}

fn type_fields(image_type: ImageType) -> Option<TypeFields> {
    match image_type {
        ImageType::Needle => Some(TypeFields {
            flag: "image_needle_saved",
            series: "needle_series_num",
            image: "needle_image_number",
            measurement: "needle_measurement",
        }),
        ImageType::Angiogram => Some(TypeFields {
            flag: "access_angio_saved",
            series: "angio_series_number",
            image: "angio_image_number",
            measurement: "angio_measurement",
        }),
        ImageType::Other => Some(TypeFields {
            flag: "image_other_ind_saved",
            series: "other_ind_series_number",
            image: "other_ind_image_number",
            measurement: "other_ind_measurement",
        }),
        ImageType::None => None,
    }
}

const CLASSIFIED_TYPES: [ImageType; 3] = [ImageType::Needle, ImageType::Angiogram, ImageType::Other];

/// Form completion status as stored by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Unverified,
    Complete,
}

impl CompletionStatus {
    pub fn code(&self) -> u8 {
        match self {
            CompletionStatus::Unverified => 1,
            CompletionStatus::Complete => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompletionStatus::Unverified => "Unverified",
            CompletionStatus::Complete => "Complete",
        }
    }
}

/// Outcome class of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    /// Response other than 200/302; needs operator attention
    Unknown,
}

/// Audit record of a save; carries lengths, never values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub record_id: String,
    pub status: SaveStatus,
    pub http_status: u16,
    pub accession_len: usize,
    pub completion: CompletionStatus,
    pub hidden_fields: usize,
    pub series_image_fields: Vec<(String, u32)>,
}

#[derive(Debug, Deserialize)]
struct HttpResponse {
    status: u16,
    #[serde(default)]
    body: String,
}

/// Completion status for a classification against the form as read.
///
/// "No images" is always complete. Otherwise complete only when every
/// selected type already has a measurement recorded.
pub fn completion_status(form_html: &str, selection: &SelectionShorthand) -> CompletionStatus {
    if selection.is_no_images() {
        return CompletionStatus::Complete;
    }

    let mut selected = selection.image_types().peekable();
    if selected.peek().is_none() {
        return CompletionStatus::Unverified;
    }

    let all_measured = selected.all(|t| {
        type_fields(t)
            .and_then(|f| form::non_empty_input(form_html, f.measurement))
            .is_some()
    });

    if all_measured {
        CompletionStatus::Complete
    } else {
        CompletionStatus::Unverified
    }
}

/// Series/image fields to send: only for selected types with a locator
pub fn series_image_fields(selection: &SelectionShorthand) -> Vec<(String, u32)> {
    let mut fields = Vec::new();
    for image_type in CLASSIFIED_TYPES {
        if let (Some(f), Some(loc)) = (type_fields(image_type), selection.locator(image_type)) {
            fields.push((f.series.to_string(), loc.series));
            fields.push((f.image.to_string(), loc.image));
        }
    }
    fields
}

/// Build the complete replacement body for a form save.
pub fn build_save_body(
    form_page: &str,
    csrf: &str,
    hidden: &[(String, String)],
    accession: &str,
    selection: &SelectionShorthand,
    completion: CompletionStatus,
) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();
    pairs.push((form::CSRF_FIELD.to_string(), csrf.to_string()));

    for (name, value) in hidden {
        if name == form::CSRF_FIELD || SAVE_EXCLUDED_FIELDS.contains(&name.as_str()) {
            continue;
        }
        pairs.push((name.clone(), value.clone()));
    }

    pairs.push(("accession_number".into(), accession.to_string()));

    for image_type in CLASSIFIED_TYPES {
        if let Some(f) = type_fields(image_type) {
            let flag = if selection.has(image_type) { "1" } else { "0" };
            pairs.push((f.flag.to_string(), flag.to_string()));
        }
    }

    for (name, value) in series_image_fields(selection) {
        pairs.push((name, value.to_string()));
    }

    if let Some(annotation) = selection.annotation().filter(|a| !a.trim().is_empty()) {
        pairs.push(("incl_excl_comments".into(), annotation.trim().to_string()));
    }

    pairs.push((format!("{}_complete", form_page), completion.code().to_string()));
    pairs.push(("submit-action".into(), "submit-btn-saverecord".into()));
    pairs.push(("submit-btn-saverecord".into(), "Save & Exit Record".into()));

    form::encode_form(&pairs)
}

/// Registry lookups and saves for one project/event
pub struct RegistrySession {
    channel: Arc<RegistryChannel>,
    config: RegistryConfig,
}

impl RegistrySession {
    pub fn new(channel: Arc<RegistryChannel>, config: RegistryConfig) -> Self {
        Self { channel, config }
    }

    pub fn channel(&self) -> &Arc<RegistryChannel> {
        &self.channel
    }

    async fn get_page(&self, record_id: &str, page: &str) -> Result<HttpResponse> {
        let raw = self
            .channel
            .run(RegistryScript::HttpGet {
                path: self.config.record_page_path(record_id, page),
            })
            .await?;
        let response: HttpResponse = serde_json::from_str(raw.trim())?;
        Ok(response)
    }

    /// Fetch identifier, procedure date and access sites for one record.
    pub async fn fetch(&self, record_id: &str) -> Result<PatientContext> {
        let demographics = self.get_page(record_id, &self.config.demographics_page).await?;
        let mrn = if demographics.status == 200 {
            form::non_empty_input(&demographics.body, "mrn")
        } else {
            None
        };
        let mrn = mrn.ok_or_else(|| ReviewError::MissingIdentifierField(record_id.to_string()))?;

        let procedure = self.get_page(record_id, &self.config.procedure_page).await?;
        if procedure.status != 200 {
            return Err(ReviewError::MissingDateField(record_id.to_string()));
        }
        let proc_date = form::non_empty_input(&procedure.body, "procedure_date")
            .ok_or_else(|| ReviewError::MissingDateField(record_id.to_string()))?;

        let viewer_date = registry_to_viewer(&proc_date)
            .map_err(|_| ReviewError::MalformedDate(record_id.to_string()))?;

        let site_1 = form::input_value(&procedure.body, "access_site_1").unwrap_or_default();
        let site_2 = form::input_value(&procedure.body, "access_site_2").unwrap_or_default();

        Ok(PatientContext::new(
            record_id,
            mrn,
            proc_date,
            viewer_date,
            site_1.trim(),
            site_2.trim(),
        ))
    }

    /// Read the form, then submit a full replacement carrying the classification.
    ///
    /// The read is never mutating; a failure before the POST leaves the
    /// registry untouched.
    pub async fn save(
        &self,
        record_id: &str,
        accession: &str,
        selection: &SelectionShorthand,
    ) -> Result<SaveOutcome> {
        let form_page = self.get_page(record_id, &self.config.form_page).await?;
        if form_page.status != 200 {
            return Err(ReviewError::Protocol(format!(
                "form read for record {} returned HTTP {}",
                record_id, form_page.status
            )));
        }

        let csrf = form::csrf_token(&form_page.body)
            .ok_or_else(|| ReviewError::Protocol(format!("CSRF token not found for record {}", record_id)))?;
        let hidden = form::hidden_fields(&form_page.body);
        let completion = completion_status(&form_page.body, selection);

        let body = build_save_body(
            &self.config.form_page,
            &csrf,
            &hidden,
            accession,
            selection,
            completion,
        );

        let raw = self
            .channel
            .run(RegistryScript::HttpPost {
                path: self.config.form_submit_path(),
                body,
            })
            .await?;
        let response: HttpResponse = serde_json::from_str(raw.trim())?;

        let status = match response.status {
            200 | 302 => SaveStatus::Saved,
            _ => SaveStatus::Unknown,
        };

        let outcome = SaveOutcome {
            record_id: record_id.to_string(),
            status,
            http_status: response.status,
            accession_len: accession.len(),
            completion,
            hidden_fields: hidden.len(),
            series_image_fields: series_image_fields(selection),
        };

        match status {
            SaveStatus::Saved => info!(
                record_id,
                selection = %selection,
                accession_len = outcome.accession_len,
                status = completion.label(),
                http_status = response.status,
                "registry saved"
            ),
            SaveStatus::Unknown => warn!(
                record_id,
                http_status = response.status,
                "unexpected registry response"
            ),
        }

        Ok(outcome)
    }
}
