use thiserror::Error;

/// Errors raised by the review workflow.
///
/// None of the messages carry identifying values (MRN, dates, accession);
/// only record identifiers, field names and lengths.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] femoral_review_common::Error),

    #[error("automation surface error: {0}")]
    Surface(String),

    #[error("automation surface timed out after {0}s")]
    SurfaceTimeout(u64),

    #[error("missing_identifier_field: record {0}")]
    MissingIdentifierField(String),

    #[error("missing_date_field: record {0}")]
    MissingDateField(String),

    #[error("malformed_date: record {0}")]
    MalformedDate(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("prompt error: {0}")]
    Prompt(String),
}

impl ReviewError {
    /// Stable snake_case code for the error taxonomy
    pub fn kind(&self) -> &'static str {
        match self {
            ReviewError::Config(_) => "config",
            ReviewError::Io(_) => "io",
            ReviewError::JsonParse(_) => "unexpected_payload",
            ReviewError::Common(e) => e.kind(),
            ReviewError::Surface(_) => "surface",
            ReviewError::SurfaceTimeout(_) => "surface_timeout",
            ReviewError::MissingIdentifierField(_) => "missing_identifier_field",
            ReviewError::MissingDateField(_) => "missing_date_field",
            ReviewError::MalformedDate(_) => "malformed_date",
            ReviewError::Protocol(_) => "protocol",
            ReviewError::Prompt(_) => "prompt",
        }
    }

    /// Lookup failure confined to one record; traversal skips past it
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            ReviewError::MissingIdentifierField(_)
                | ReviewError::MissingDateField(_)
                | ReviewError::MalformedDate(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
