//! Error type definitions

use thiserror::Error;

/// Shared error type
#[derive(Error, Debug)]
pub enum Error {
    /// Carries the reason only, never the offending value
    #[error("malformed_date: {0}")]
    MalformedDate(String),

    #[error("{0}")]
    InvalidSelection(String),

    #[error("{0}")]
    NoRows(String),
}

impl Error {
    /// Stable snake_case code for status payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedDate(_) => "malformed_date",
            Error::InvalidSelection(_) => "invalid_input",
            Error::NoRows(_) => "no_rows",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_malformed_date() {
        let error = Error::MalformedDate("month out of range".to_string());
        assert_eq!(format!("{}", error), "malformed_date: month out of range");
        assert_eq!(error.kind(), "malformed_date");
    }

    #[test]
    fn test_error_display_invalid_selection() {
        let error = Error::InvalidSelection("Empty selection.".to_string());
        assert_eq!(format!("{}", error), "Empty selection.");
        assert_eq!(error.kind(), "invalid_input");
    }

    #[test]
    fn test_error_debug() {
        let error = Error::NoRows("no rows found".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("NoRows"));
    }
}
