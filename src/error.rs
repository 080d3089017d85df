//! Error types for the clock checker

use crate::metadata::FieldName;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for clock checker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the clock checker
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid rational {numerator}/{denominator}: {reason}")]
    InvalidRational {
        numerator: i64,
        denominator: i64,
        reason: &'static str,
    },

    #[error("missing EXIF field {0}")]
    MissingField(FieldName),

    #[error("malformed date {value:?} in {field}")]
    MalformedDate { field: FieldName, value: String },

    #[error("malformed date/time {value:?} in {field}: {message}")]
    MalformedDateTime {
        field: FieldName,
        value: String,
        message: String,
    },

    #[error("{field} is not stored as {expected}")]
    UnsupportedFormat {
        field: FieldName,
        expected: &'static str,
    },

    #[error("coordinate out of range: lat={latitude}, long={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("unknown timezone {zone:?}: {message}")]
    UnknownZone { zone: String, message: String },

    #[error("{0}")]
    DecodeFailed(String),

    #[error("no camera or GPS time available")]
    NoTimeAvailable,

    #[error("Input path does not exist: {path}")]
    InputNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl Error {
    /// Short label used as the prefix of a per-file diagnostic line
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "open",
            Error::DecodeFailed(_) | Error::NoTimeAvailable => "exif",
            Error::InputNotFound { .. } | Error::WalkDir(_) => "walk",
            _ => "time",
        }
    }
}
