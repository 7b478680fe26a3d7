//! Error taxonomy for operators, ingestion and sinks.
//!
//! Field-level errors (`MissingField`, `TypeMismatch`, `Overflow`) are local
//! to one record: operators reject the record and keep running. Everything else
//! propagates to whoever called `accept` or `flush`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// A required field is absent from the record
    #[error("missing field `{field}`")]
    MissingField { field: String },

    /// The field is present but holds a different value case
    #[error("field `{field}` holds {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Integer arithmetic on `field` left the `i64` range
    #[error("integer overflow in `{field}`")]
    Overflow { field: String },

    /// An input line could not be turned into a record
    #[error("malformed input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    /// Pipeline plumbing broke an assumption (e.g. epoch field missing)
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StreamError {
    pub fn missing(field: impl Into<String>) -> Self {
        StreamError::MissingField {
            field: field.into(),
        }
    }

    /// True when the error only disqualifies the record that produced it.
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            StreamError::MissingField { .. }
                | StreamError::TypeMismatch { .. }
                | StreamError::Overflow { .. }
        )
    }
}

/// A CSV writer that could not flush its buffer while being unwrapped.
impl<W> From<csv::IntoInnerError<W>> for StreamError {
    fn from(err: csv::IntoInnerError<W>) -> Self {
        StreamError::Io(std::io::Error::new(err.error().kind(), err.error().to_string()))
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
