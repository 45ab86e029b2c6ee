use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::expr::ExprKind;

/// Universal error type for DjVu operations.
///
/// Covers handle acquisition, decode-job outcomes, expression access and the
/// structured decoding built on top of it. Absence of data is never an error:
/// operations that can come back empty return `Ok(None)` instead.
#[derive(Debug, Clone, Error)]
pub enum DjvuError {
    /// A null handle where a live engine resource was required
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    /// The document path does not exist
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A decode job (document, page or queried artifact) ended in failure
    #[error("decoding failed for {job}{}", .reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default())]
    DecodeFailed { job: String, reason: Option<String> },

    /// A decode job was interrupted before completion
    #[error("decoding stopped for {job}")]
    DecodeStopped { job: String },

    /// The engine reported a status outside the documented set
    #[error("unexpected job status {status} for {job}")]
    UnexpectedStatus { job: String, status: u32 },

    /// An expression was read as the wrong variant
    #[error("expected {expected} expression, found {found}")]
    InvalidVariantAccess { expected: ExprKind, found: ExprKind },

    /// List traversal on something that is not a list
    #[error("expected a list expression, found {found}")]
    NotAList { found: ExprKind },

    /// Element or page index outside `[0, length)`
    #[error("index {index} out of range for length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    /// A structured decode found the wrong arity or field type
    #[error("malformed {record} record: {detail}")]
    MalformedRecord { record: String, detail: String },

    /// Integer does not fit the 30-bit expression encoding
    #[error("integer {0} is outside the expression range")]
    IntegerOutOfRange(i64),

    /// A bounded wait ran out of time
    #[error("timed out after {waited:?} waiting for {job}")]
    Timeout { job: String, waited: Duration },

    /// A bounded wait was cancelled through its cancel flag
    #[error("wait for {job} was cancelled")]
    Cancelled { job: String },

    /// Textual S-expression could not be read
    #[error("syntax error at byte {offset}: {detail}")]
    Syntax { offset: usize, detail: String },

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

impl DjvuError {
    /// Shorthand for a [`DjvuError::MalformedRecord`].
    pub fn malformed(record: impl Into<String>, detail: impl Into<String>) -> Self {
        DjvuError::MalformedRecord {
            record: record.into(),
            detail: detail.into(),
        }
    }
}

/// Result type alias for DjVu operations
pub type DjvuResult<T> = Result<T, DjvuError>;
