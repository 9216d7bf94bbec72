//! Typed errors for fonttag-core (made by FontLab https://www.fontlab.com/)
//!
//! Callers that only want to report a failure can keep using `anyhow`; the
//! enums here exist for callers that need to tell a bad rule apart from a
//! missing file.

use thiserror::Error;

/// A rule expression that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    /// Byte offset into the rule source where the problem was detected.
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Failure to read or decode one of the flat reference files.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The underlying text could not be read.
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// The text was read but does not have the expected shape.
    #[error("malformed {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl LoadError {
    pub(crate) fn malformed(path: &str, reason: impl std::fmt::Display) -> Self {
        LoadError::Malformed {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A location spec or axis tag that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("axis tag must be 1-4 printable ASCII chars: {0:?}")]
    InvalidAxisTag(String),

    #[error("location spec is missing '@': {0:?}")]
    MissingSeparator(String),

    #[error("location spec has {axes} axes but {values} values")]
    LengthMismatch { axes: usize, values: usize },

    #[error("invalid axis value: {0:?}")]
    InvalidValue(String),

    #[error("axis {0} appears twice")]
    DuplicateAxis(String),
}
