//! Study row reading, choice, and opening

use super::{check_error, Viewer};
use crate::config::settle;
use crate::error::{ReviewError, Result};
use crate::surface::ViewerScript;
use femoral_review_common::study::all_collapsed;
use femoral_review_common::{select_study, CandidateStudyRow, Error as CommonError, StudyChoice};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct RowsPayload {
    #[serde(default)]
    rows: Vec<CandidateStudyRow>,
    #[serde(default)]
    error: Option<String>,
}

/// Row position inside the viewer plus the browser window geometry
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RowGeometry {
    /// Row centre in viewport coordinates
    pub vx: f64,
    pub vy: f64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub outer_width: f64,
    pub outer_height: f64,
    pub inner_width: f64,
    pub inner_height: f64,
}

/// Convert a viewport point to absolute screen coordinates.
///
/// The window chrome is whatever the outer height leaves after the scaled
/// viewport; it sits above the content.
pub fn to_screen(g: &RowGeometry) -> Option<(i32, i32)> {
    if g.inner_width <= 0.0 {
        return None;
    }
    let scale = g.outer_width / g.inner_width;
    let chrome_h = g.outer_height - g.inner_height * scale;
    let x = g.screen_x + g.vx * scale;
    let y = g.screen_y + chrome_h + g.vy * scale;
    Some((x.round() as i32, y.round() as i32))
}

impl Viewer {
    async fn read_rows(&self) -> Result<Vec<CandidateStudyRow>> {
        let raw = self.channel.run(ViewerScript::ReadStudyRows).await?;
        let payload: RowsPayload = serde_json::from_str(raw.trim())?;
        if let Some(err) = payload.error {
            return Err(ReviewError::Protocol(format!("study rows: {}", err)));
        }
        Ok(payload.rows)
    }

    /// Read the result rows and pick the study to review.
    ///
    /// If every row is collapsed the first group is expanded once and the
    /// rows are read again.
    pub async fn choose_study(&self) -> Result<StudyChoice> {
        settle(self.timing.results_settle_ms).await;

        let mut rows = self.read_rows().await?;
        if rows.is_empty() {
            return Err(CommonError::NoRows("no study rows".into()).into());
        }

        if all_collapsed(&rows) {
            debug!(rows = rows.len(), "all rows collapsed, expanding first");
            let result = self.channel.run_json(ViewerScript::ExpandFirstRow).await?;
            if result.get("error").is_some() {
                return Err(CommonError::NoRows("no expand toggle found".into()).into());
            }
            settle(self.timing.expand_settle_ms).await;
            rows = self.read_rows().await?;
        }

        let choice = select_study(&rows)?;
        if choice.accession.trim().is_empty() {
            return Err(ReviewError::Protocol("chosen study has no accession".into()));
        }

        info!(
            index = choice.index,
            images = choice.images,
            modality = %choice.modality,
            rule = %choice.rule,
            accession_len = choice.accession.len(),
            "study chosen"
        );
        Ok(choice)
    }

    /// Open the chosen study by double-clicking its row
    pub async fn open_study(&self, index: usize) -> Result<()> {
        let value = self.channel.run_json(ViewerScript::LocateRow { index }).await?;
        check_error("locate row", &value)?;

        let geometry: RowGeometry = serde_json::from_value(value)?;
        let (x, y) = to_screen(&geometry)
            .ok_or_else(|| ReviewError::Protocol("viewer reported zero viewport width".into()))?;

        debug!(index, x, y, "opening study");
        self.channel.double_click(x, y).await
    }
}
