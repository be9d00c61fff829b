use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

/// Failures that abort a graph -> MIDI conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("value {value} of {predicate} on {subject} is not numeric")]
    InvalidNumber {
        subject: String,
        predicate: String,
        value: String,
    },

    #[error("{subject} has no {predicate}")]
    MissingField { subject: String, predicate: String },

    #[error("invalid {field} {value}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: i64,
        reason: &'static str,
    },
}
