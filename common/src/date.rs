//! Registry → viewer date conversion
//!
//! The registry stores procedure dates as zero-padded `MM-DD-YYYY`; the
//! viewer's date filter expects `mon dd, yyyy` in lowercase.

use crate::error::{Error, Result};
use chrono::NaiveDate;

/// Convert a registry date (`01-15-2024`) into the viewer search form (`jan 15, 2024`).
///
/// Any input that is not exactly three dash-separated numeric segments of
/// widths 2/2/4 naming a real calendar day fails with `malformed_date`.
/// The error never echoes the input.
pub fn registry_to_viewer(registry_date: &str) -> Result<String> {
    let parts: Vec<&str> = registry_date.trim().split('-').collect();
    if parts.len() != 3 {
        return Err(Error::MalformedDate("expected MM-DD-YYYY".into()));
    }

    let widths = [2, 2, 4];
    for (part, width) in parts.iter().zip(widths) {
        if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::MalformedDate("expected MM-DD-YYYY".into()));
        }
    }

    let month: u32 = parse_segment(parts[0])?;
    let day: u32 = parse_segment(parts[1])?;
    let year: i32 = parse_segment(parts[2])?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::MalformedDate("not a calendar date".into()))?;

    Ok(date.format("%b %d, %Y").to_string().to_lowercase())
}

fn parse_segment<T: std::str::FromStr>(segment: &str) -> Result<T> {
    segment
        .parse()
        .map_err(|_| Error::MalformedDate("non-numeric segment".into()))
}
