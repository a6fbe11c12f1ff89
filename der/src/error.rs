use thiserror::Error;

/// Reasons a TLV cannot be decoded, or an eager decode was cut short.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("truncated identifier")]
    TruncatedIdentifier,
    #[error("tag number does not fit in 32 bits")]
    TagNumberOverflow,
    #[error("truncated length")]
    TruncatedLength,
    #[error("indefinite length is not supported")]
    IndefiniteLength,
    #[error("reserved length octet 0xFF")]
    ReservedLength,
    #[error("length of {0} octets is too large")]
    LengthOverflow(u8),
    #[error("truncated body: declared {declared} bytes, {available} available")]
    TruncatedBody { declared: usize, available: usize },
    #[error("nesting deeper than {0} levels")]
    DepthLimitExceeded(usize),
    #[error("more than {0} nodes")]
    NodeLimitExceeded(usize),
}
