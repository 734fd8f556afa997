//! Error types for SiteAssay

use thiserror::Error;

/// Main error type for SiteAssay operations.
///
/// Every failure aborts the run; nothing is retried because all failures
/// are deterministic functions of the input.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("field '{field}' is missing on point '{point_id}'")]
    MissingField { field: String, point_id: String },

    #[error("field '{field}' on point '{point_id}' is not numeric: {value}")]
    NonNumericField {
        field: String,
        point_id: String,
        value: String,
    },

    #[error("insufficient {what}: need at least {required}, found {found}")]
    InsufficientData {
        what: &'static str,
        required: usize,
        found: usize,
    },

    #[error("numerical error: {reason}")]
    Numerical { reason: String },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("interpolation error: {0}")]
    Interpolation(String),

    #[error("invalid configuration: {name} = {value} ({reason})")]
    InvalidConfig {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Category of an [`Error`], used by callers to decide how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or missing input fields; user-correctable.
    Validation,
    /// Ill-conditioned matrix or other numerical breakdown.
    Numerical,
    /// Insufficient or ambiguous spatial input.
    Interpolation,
    /// Inconsistent configuration, detected before computation.
    Config,
    /// Unreadable or inconsistent input sources.
    Input,
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for the ill-conditioned matrix failure.
    pub fn ill_conditioned() -> Self {
        Error::Numerical {
            reason: "ill-conditioned".into(),
        }
    }

    /// Taxonomy category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingField { .. }
            | Error::NonNumericField { .. }
            | Error::InsufficientData { .. } => ErrorKind::Validation,
            Error::Numerical { .. } => ErrorKind::Numerical,
            Error::DegenerateGeometry(_) | Error::Interpolation(_) => ErrorKind::Interpolation,
            Error::InvalidConfig { .. } => ErrorKind::Config,
            Error::Io(_) | Error::CrsMismatch(..) | Error::InvalidInput(_) | Error::Json(_) => {
                ErrorKind::Input
            }
        }
    }
}

/// Result type alias for SiteAssay operations
pub type Result<T> = std::result::Result<T, Error>;
