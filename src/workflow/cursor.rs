//! Eligible-record walk shared by the synchronous and prefetch paths

use crate::error::Result;
use crate::patient::PatientContext;
use crate::registry::dashboard::resume_index;
use crate::registry::RegistrySession;
use tracing::{info, warn};

/// An eligible record and where it sits in the dashboard snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub index: usize,
    pub total: usize,
    pub patient: PatientContext,
}

impl Located {
    /// One-based "N of M" text
    pub fn position(&self) -> String {
        format!("{} of {}", self.index + 1, self.total)
    }
}

/// Walk `records` after `after`, fetching each candidate until one has
/// femoral access. `Ok(None)` means the snapshot ran out.
///
/// Records with missing or malformed fields are logged and skipped; any
/// other failure (surface down, bad payload) stops the walk.
pub async fn next_eligible(
    registry: &RegistrySession,
    records: &[String],
    after: Option<&str>,
) -> Result<Option<Located>> {
    let Some(start) = resume_index(records, after) else {
        return Ok(None);
    };

    for (index, record_id) in records.iter().enumerate().skip(start) {
        let patient = match registry.fetch(record_id).await {
            Ok(p) => p,
            Err(e) if e.is_record_level() => {
                warn!(record_id = %record_id, kind = e.kind(), "skipping record");
                continue;
            }
            Err(e) => return Err(e),
        };

        if !patient.has_femoral() {
            let (site_1, site_2) = patient.access_sites();
            info!(record_id = %record_id, site_1, site_2, "skipping record without femoral access");
            continue;
        }

        return Ok(Some(Located {
            index,
            total: records.len(),
            patient,
        }));
    }

    Ok(None)
}
