//! Patient context for the record under review
//!
//! Identifying values (MRN, procedure dates, accession) live only here.
//! Anything that leaves this type for display or logging goes through
//! [`PatientSummary`], which carries lengths and booleans instead.

use serde::Serialize;
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct PatientContext {
    record_id: String,
    mrn: String,
    proc_date_registry: String,
    proc_date_viewer: String,
    access_site_1: String,
    access_site_2: String,
    has_femoral: bool,
    accession: Option<String>,
}

/// Loggable view of a patient context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientSummary {
    pub record_id: String,
    pub mrn_len: usize,
    pub date_len: usize,
    pub has_femoral: bool,
    pub accession_len: Option<usize>,
}

impl PatientContext {
    pub fn new(
        record_id: impl Into<String>,
        mrn: impl Into<String>,
        proc_date_registry: impl Into<String>,
        proc_date_viewer: impl Into<String>,
        access_site_1: impl Into<String>,
        access_site_2: impl Into<String>,
    ) -> Self {
        let access_site_1 = access_site_1.into();
        let access_site_2 = access_site_2.into();
        let has_femoral =
            femoral_review_common::has_femoral_access(&access_site_1, &access_site_2);
        Self {
            record_id: record_id.into(),
            mrn: mrn.into(),
            proc_date_registry: proc_date_registry.into(),
            proc_date_viewer: proc_date_viewer.into(),
            access_site_1,
            access_site_2,
            has_femoral,
            accession: None,
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn mrn(&self) -> &str {
        &self.mrn
    }

    pub fn proc_date_registry(&self) -> &str {
        &self.proc_date_registry
    }

    pub fn proc_date_viewer(&self) -> &str {
        &self.proc_date_viewer
    }

    pub fn access_sites(&self) -> (&str, &str) {
        (&self.access_site_1, &self.access_site_2)
    }

    pub fn has_femoral(&self) -> bool {
        self.has_femoral
    }

    pub fn accession(&self) -> Option<&str> {
        self.accession.as_deref()
    }

    pub fn set_accession(&mut self, accession: impl Into<String>) {
        self.accession = Some(accession.into());
    }

    pub fn clear_accession(&mut self) {
        self.accession = None;
    }

    pub fn summary(&self) -> PatientSummary {
        PatientSummary {
            record_id: self.record_id.clone(),
            mrn_len: self.mrn.len(),
            date_len: self.proc_date_registry.len(),
            has_femoral: self.has_femoral,
            accession_len: self.accession.as_ref().map(String::len),
        }
    }
}

impl fmt::Debug for PatientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.summary(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility_computed_on_construction() {
        let p = PatientContext::new("100", "123456789", "01-15-2024", "jan 15, 2024", "2", "");
        assert!(p.has_femoral());

        let p = PatientContext::new("101", "123456789", "01-15-2024", "jan 15, 2024", "4", "5");
        assert!(!p.has_femoral());
    }

    #[test]
    fn test_debug_never_shows_identifiers() {
        let mut p = PatientContext::new("100", "123456789", "01-15-2024", "jan 15, 2024", "2", "");
        p.set_accession("ACC99887766");
        let debug = format!("{:?}", p);
        assert!(debug.contains("100"));
        assert!(!debug.contains("123456789"));
        assert!(!debug.contains("01-15-2024"));
        assert!(!debug.contains("ACC99887766"));
        assert!(debug.contains("mrn_len: 9"));
    }
}
