//! Coordinator selection shorthand
//!
//! Grammar:
//! - `0` alone → no images
//! - `<type> <series> <image>` segments, comma-separated, where type is
//!   1 (needle), 2 (angiogram) or 3 (other)
//! - an optional trailing non-numeric token is an annotation, e.g. `2 1 23 DSA`
//!
//! Parsing is all-or-nothing: the first malformed segment aborts with a
//! descriptive message and nothing is applied.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Image-type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    None,
    Needle,
    Angiogram,
    Other,
}

impl ImageType {
    /// Shorthand code (0-3)
    pub fn code(&self) -> u8 {
        match self {
            ImageType::None => 0,
            ImageType::Needle => 1,
            ImageType::Angiogram => 2,
            ImageType::Other => 3,
        }
    }

    fn from_segment_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ImageType::Needle),
            2 => Some(ImageType::Angiogram),
            3 => Some(ImageType::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageType::None => write!(f, "none"),
            ImageType::Needle => write!(f, "needle"),
            ImageType::Angiogram => write!(f, "angiogram"),
            ImageType::Other => write!(f, "other"),
        }
    }
}

/// Series/image position of the representative frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Locator {
    pub series: u32,
    pub image: u32,
}

/// Parsed classification
///
/// `ImageType::None` never coexists with another tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SelectionShorthand {
    entries: BTreeMap<ImageType, Option<Locator>>,
    annotation: Option<String>,
}

impl SelectionShorthand {
    /// Classification meaning "no relevant images"
    pub fn no_images() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(ImageType::None, None);
        Self { entries, annotation: None }
    }

    /// Parse a full coordinator input line (shorthand plus optional annotation).
    pub fn parse(line: &str) -> Result<Self> {
        let (shorthand, annotation) = split_annotation(line);
        let mut parsed = parse_shorthand(&shorthand)?;
        parsed.annotation = annotation;
        Ok(parsed)
    }

    pub fn is_no_images(&self) -> bool {
        self.entries.contains_key(&ImageType::None)
    }

    pub fn has(&self, image_type: ImageType) -> bool {
        self.entries.contains_key(&image_type)
    }

    pub fn locator(&self, image_type: ImageType) -> Option<Locator> {
        self.entries.get(&image_type).copied().flatten()
    }

    /// Selected image types excluding `None`, in code order
    pub fn image_types(&self) -> impl Iterator<Item = ImageType> + '_ {
        self.entries.keys().copied().filter(|t| *t != ImageType::None)
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        let annotation = annotation.into();
        self.annotation = if annotation.trim().is_empty() {
            None
        } else {
            Some(annotation.trim().to_string())
        };
        self
    }
}

impl fmt::Display for SelectionShorthand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_no_images() {
            return write!(f, "none");
        }
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(t, loc)| match loc {
                Some(l) => format!("{}(Se{}/Im{})", t, l.series, l.image),
                None => t.to_string(),
            })
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Split a raw input line into (shorthand, annotation).
///
/// The last whitespace token is an annotation when there is more than one
/// token and it is not purely numeric once commas are removed.
pub fn split_annotation(line: &str) -> (String, Option<String>) {
    let trimmed = line.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 2 {
        return (trimmed.to_string(), None);
    }

    let last = tokens[tokens.len() - 1];
    let stripped = last.replace(',', "");
    let numeric = !stripped.is_empty() && stripped.bytes().all(|b| b.is_ascii_digit());
    if numeric || stripped.is_empty() {
        return (trimmed.to_string(), None);
    }

    (tokens[..tokens.len() - 1].join(" "), Some(last.to_string()))
}

/// Parse the shorthand part (no annotation).
pub fn parse_shorthand(shorthand: &str) -> Result<SelectionShorthand> {
    let shorthand = shorthand.trim();
    if shorthand.is_empty() {
        return Err(Error::InvalidSelection("Empty selection.".into()));
    }

    if shorthand == "0" {
        return Ok(SelectionShorthand::no_images());
    }

    let segments: Vec<&str> = shorthand.split(',').map(str::trim).collect();
    if segments.len() > 1 && segments.contains(&"0") {
        return Err(Error::InvalidSelection(
            "Selection '0' cannot be combined with other image types.".into(),
        ));
    }

    let mut entries = BTreeMap::new();
    for segment in segments {
        let (image_type, locator) = parse_segment(segment)?;
        // a repeated type replaces the earlier locator
        entries.insert(image_type, Some(locator));
    }

    Ok(SelectionShorthand { entries, annotation: None })
}

fn parse_segment(segment: &str) -> Result<(ImageType, Locator)> {
    if segment.is_empty() {
        return Err(Error::InvalidSelection("Empty segment in selection.".into()));
    }

    let tokens: Vec<&str> = segment.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(Error::InvalidSelection(format!(
            "Invalid segment '{}'. Expected 'type series image'.",
            segment
        )));
    }

    let image_type = tokens[0]
        .parse::<u8>()
        .ok()
        .and_then(ImageType::from_segment_code)
        .ok_or_else(|| {
            Error::InvalidSelection(format!(
                "Invalid image type '{}'. Use 1, 2, or 3 (or '0' alone).",
                tokens[0]
            ))
        })?;

    let positive = |token: &str| token.parse::<u32>().ok().filter(|n| *n >= 1);
    match (positive(tokens[1]), positive(tokens[2])) {
        (Some(series), Some(image)) => Ok((image_type, Locator { series, image })),
        _ => Err(Error::InvalidSelection(format!(
            "Invalid segment '{}'. Series and image must be positive integers.",
            segment
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_no_images() {
        let sel = SelectionShorthand::parse("0").unwrap();
        assert!(sel.is_no_images());
        assert_eq!(sel.image_types().count(), 0);
        assert_eq!(sel.locator(ImageType::None), None);
    }

    #[test]
    fn test_zero_cannot_combine() {
        let err = SelectionShorthand::parse("0, 1 1 5").unwrap_err();
        assert!(matches!(err, Error::InvalidSelection(_)));
        assert!(err.to_string().contains("cannot be combined"));

        assert!(SelectionShorthand::parse("1 1 5, 0").is_err());
    }

    #[test]
    fn test_needle_and_angiogram() {
        let sel = SelectionShorthand::parse("2 1 23, 1 1 5").unwrap();
        assert!(sel.has(ImageType::Needle));
        assert!(sel.has(ImageType::Angiogram));
        assert!(!sel.has(ImageType::Other));
        assert_eq!(sel.locator(ImageType::Angiogram), Some(Locator { series: 1, image: 23 }));
        assert_eq!(sel.locator(ImageType::Needle), Some(Locator { series: 1, image: 5 }));
        assert_eq!(sel.to_string(), "needle(Se1/Im5), angiogram(Se1/Im23)");
    }

    #[test]
    fn test_series_must_be_positive() {
        let err = SelectionShorthand::parse("1 0 5").unwrap_err();
        assert!(err.to_string().contains("positive integers"));
        assert!(SelectionShorthand::parse("1 2 0").is_err());
        assert!(SelectionShorthand::parse("1 -2 3").is_err());
    }

    #[test]
    fn test_bad_type_and_token_count() {
        assert!(SelectionShorthand::parse("4 1 1").unwrap_err().to_string().contains("Invalid image type"));
        assert!(SelectionShorthand::parse("2 1").unwrap_err().to_string().contains("Expected"));
        assert!(SelectionShorthand::parse("2 1 23,").unwrap_err().to_string().contains("Empty segment"));
        assert!(SelectionShorthand::parse("").unwrap_err().to_string().contains("Empty selection"));
    }

    #[test]
    fn test_duplicate_type_overwrites() {
        let sel = SelectionShorthand::parse("2 1 23, 2 3 7").unwrap();
        assert_eq!(sel.locator(ImageType::Angiogram), Some(Locator { series: 3, image: 7 }));
        assert_eq!(sel.image_types().count(), 1);
    }

    #[test]
    fn test_trailing_annotation() {
        let sel = SelectionShorthand::parse("2 1 23 DSA").unwrap();
        assert_eq!(sel.annotation(), Some("DSA"));
        assert_eq!(sel.locator(ImageType::Angiogram), Some(Locator { series: 1, image: 23 }));

        let sel = SelectionShorthand::parse("0 limited").unwrap();
        assert!(sel.is_no_images());
        assert_eq!(sel.annotation(), Some("limited"));
    }

    #[test]
    fn test_split_annotation_numeric_tail_kept() {
        assert_eq!(split_annotation("1 1 5, 2 1 23"), ("1 1 5, 2 1 23".to_string(), None));
        assert_eq!(split_annotation("1 1 5,"), ("1 1 5,".to_string(), None));
        assert_eq!(split_annotation("DSA"), ("DSA".to_string(), None));
        assert_eq!(
            split_annotation("1 1 5, 2 1 23 DSA"),
            ("1 1 5, 2 1 23".to_string(), Some("DSA".to_string()))
        );
    }

    #[test]
    fn test_no_partial_application() {
        // valid first segment, broken second: nothing comes back
        assert!(SelectionShorthand::parse("1 1 5, 2 x 3").is_err());
    }
}
