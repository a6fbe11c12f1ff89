use base64::DecodeError;
use thiserror::Error;

/// Reasons a buffer does not start with a well-formed PEM block.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The buffer does not start with `-----BEGIN <label>-----`.
    #[error("missing a pre encapsulation boundary")]
    MissingPreEncapsulationBoundary,

    /// No `-----END <label>-----` line follows the BEGIN line.
    #[error("missing a post encapsulation boundary")]
    MissingPostEncapsulationBoundary,

    #[error("label doesn't match: BEGIN {begin}, END {end}")]
    LabelMismatch { begin: String, end: String },

    #[error("invalid encapsulation boundary")]
    InvalidEncapsulationBoundary,

    #[error("base64 decode: {0}")]
    Base64Decode(DecodeError),
}
