use thiserror::Error;

use crate::kind::Kind;

/// Result alias used across the crate.
pub type CastResult<T> = Result<T, CastError>;

/// Error variants surfaced by the coercion engines.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CastError {
    #[error("the value handle is invalid: {0}")]
    InvalidValue(String),
    #[error("can't read the value of kind {kind} type {ty}")]
    Unreadable { kind: Kind, ty: String },
    #[error("assigner doesn't have the ability to set the value")]
    CannotSet,
    #[error("assigner encounters overflow for {target}, underlying value: {value}")]
    Overflow { target: String, value: String },
    #[error(
        "length of assigner is smaller than the length of value, assigner type: {assigner_ty} length: {assigner_len}, value type: {value_ty} length: {value_len}"
    )]
    LengthExceeded {
        assigner_ty: String,
        assigner_len: usize,
        value_ty: String,
        value_len: usize,
    },
    #[error("unassignable value for kind {kind}, value kind: {value_kind} type: {value_ty}")]
    Unassignable {
        kind: Kind,
        value_kind: Kind,
        value_ty: String,
    },
    #[error("unimplemented {operation} for kind {kind}, value kind: {value_kind} type: {value_ty}")]
    UnimplementedCombination {
        operation: &'static str,
        kind: Kind,
        value_kind: Kind,
        value_ty: String,
    },
    #[error("failed to parse {input:?} as {target}: {reason}")]
    ParseFailure {
        target: &'static str,
        input: String,
        reason: String,
    },
    #[error("conversion capability failed: {0}")]
    Capability(String),
    #[error("recovered from panic: {0}")]
    Panic(String),
    #[error("structural decoding failed: {0}")]
    Decode(String),
    #[error("serde conversion error: {0}")]
    Serde(String),
}

impl CastError {
    pub(crate) fn parse(target: &'static str, input: &str, reason: impl ToString) -> Self {
        CastError::ParseFailure {
            target,
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn overflow(target: impl ToString, value: impl ToString) -> Self {
        CastError::Overflow {
            target: target.to_string(),
            value: value.to_string(),
        }
    }

    /// True for errors caused by a value outside the representable range.
    pub fn is_overflow(&self) -> bool {
        matches!(self, CastError::Overflow { .. })
    }
}
