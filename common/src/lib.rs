//! Femoral Review Common Library
//!
//! I/O-free logic shared by the workflow engine and its tests:
//! date conversion, selection shorthand, study selection, eligibility.

pub mod date;
pub mod eligibility;
pub mod error;
pub mod selection;
pub mod study;

pub use date::registry_to_viewer;
pub use eligibility::{has_femoral_access, FEMORAL_ACCESS_CODES};
pub use error::{Error, Result};
pub use selection::{ImageType, Locator, SelectionShorthand};
pub use study::{select_study, CandidateStudyRow, MatchRule, StudyChoice};
