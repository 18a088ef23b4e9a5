//! Study row selection
//!
//! Picks the imaging study most likely to hold the access-site frames from
//! the viewer's (noisy) result list.
//!
//! Priority:
//! 1. rows with more than one image whose description starts with an
//!    institutional angiography/fluoroscopy prefix, highest image count
//! 2. otherwise the row with the highest image count overall
//!
//! Ties keep the first row seen (strict `>`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Description prefixes marking angiography/fluoroscopy studies, in priority order
pub const PREFERRED_PREFIXES: &[&str] = &[
    "NR FL",
    "HVC NONREPORTABLE",
    "PV TRANSCATHETER",
    "PV ANGIOGRAPHY",
];

/// Length of the description excerpt surfaced to the operator
pub const DESC_PREFIX_LEN: usize = 30;

/// One result row as read from the viewer; never persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateStudyRow {
    pub description: String,
    pub modality: String,
    pub images: u32,
    pub accession: String,
    /// Row exposes detail columns (collapsed group headers do not)
    pub expanded: bool,
}

/// Which rule picked the row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    Preferred(&'static str),
    MaxImages,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::Preferred(prefix) => write!(f, "{}", prefix),
            MatchRule::MaxImages => write!(f, "max_images"),
        }
    }
}

/// Selected study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyChoice {
    /// Position in the row list as read (used to locate it on screen)
    pub index: usize,
    pub accession: String,
    pub images: u32,
    pub modality: String,
    pub desc_prefix: String,
    pub rule: MatchRule,
}

/// Return the preferred prefix a description starts with, if any.
pub fn preferred_prefix(description: &str) -> Option<&'static str> {
    let upper = description.trim().to_uppercase();
    PREFERRED_PREFIXES
        .iter()
        .copied()
        .find(|prefix| upper.starts_with(prefix))
}

/// True when no row exposes detail columns
pub fn all_collapsed(rows: &[CandidateStudyRow]) -> bool {
    !rows.iter().any(|r| r.expanded)
}

/// Choose the best study row.
///
/// Only expanded rows take part. Fails with `NoRows` when there are none.
pub fn select_study(rows: &[CandidateStudyRow]) -> Result<StudyChoice> {
    let mut preferred: Option<(usize, &'static str)> = None;
    let mut best: Option<usize> = None;

    for (i, row) in rows.iter().enumerate() {
        if !row.expanded {
            continue;
        }

        if row.images > 1 {
            if let Some(prefix) = preferred_prefix(&row.description) {
                let better = match preferred {
                    Some((p, _)) => row.images > rows[p].images,
                    None => true,
                };
                if better {
                    preferred = Some((i, prefix));
                }
            }
        }

        let better = match best {
            Some(b) => row.images > rows[b].images,
            None => true,
        };
        if better {
            best = Some(i);
        }
    }

    let (index, rule) = match (preferred, best) {
        (Some((i, prefix)), _) => (i, MatchRule::Preferred(prefix)),
        (None, Some(i)) => (i, MatchRule::MaxImages),
        (None, None) => return Err(Error::NoRows("no expanded rows".into())),
    };

    let row = &rows[index];
    Ok(StudyChoice {
        index,
        accession: row.accession.trim().to_string(),
        images: row.images,
        modality: row.modality.trim().to_string(),
        desc_prefix: row.description.trim().chars().take(DESC_PREFIX_LEN).collect(),
        rule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(desc: &str, images: u32) -> CandidateStudyRow {
        CandidateStudyRow {
            description: desc.to_string(),
            modality: "XA".to_string(),
            images,
            accession: format!("ACC{}", images),
            expanded: true,
        }
    }

    #[test]
    fn test_single_image_preferred_row_is_skipped() {
        let rows = vec![row("US Doppler", 5), row("NR FL Angio", 1), row("NR FL Angio", 4)];
        let choice = select_study(&rows).unwrap();
        assert_eq!(choice.index, 2);
        assert_eq!(choice.images, 4);
        assert_eq!(choice.rule, MatchRule::Preferred("NR FL"));
    }

    #[test]
    fn test_fallback_highest_image_count() {
        let rows = vec![row("US Doppler", 5), row("CT Chest", 40), row("XR Knee", 2)];
        let choice = select_study(&rows).unwrap();
        assert_eq!(choice.index, 1);
        assert_eq!(choice.rule, MatchRule::MaxImages);
    }

    #[test]
    fn test_fallback_may_pick_single_image_row() {
        let rows = vec![row("NR FL Angio", 1)];
        let choice = select_study(&rows).unwrap();
        assert_eq!(choice.rule, MatchRule::MaxImages);
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let rows = vec![row("PV ANGIOGRAPHY LEFT", 8), row("NR FL Angio", 8)];
        let choice = select_study(&rows).unwrap();
        assert_eq!(choice.index, 0);
        assert_eq!(choice.rule, MatchRule::Preferred("PV ANGIOGRAPHY"));
    }

    #[test]
    fn test_prefix_case_insensitive() {
        assert_eq!(preferred_prefix("  hvc nonreportable study"), Some("HVC NONREPORTABLE"));
        assert_eq!(preferred_prefix("US NR FL"), None);
    }

    #[test]
    fn test_collapsed_rows_ignored() {
        let mut collapsed = row("NR FL Angio", 9);
        collapsed.expanded = false;
        assert!(all_collapsed(&[collapsed.clone()]));
        let err = select_study(&[collapsed]).unwrap_err();
        assert!(matches!(err, Error::NoRows(_)));
    }

    #[test]
    fn test_desc_prefix_truncated() {
        let rows = vec![row("NR FL ANGIOGRAPHY LOWER EXTREMITY BILATERAL RUNOFF", 12)];
        let choice = select_study(&rows).unwrap();
        assert_eq!(choice.desc_prefix.chars().count(), DESC_PREFIX_LEN);
    }
}
