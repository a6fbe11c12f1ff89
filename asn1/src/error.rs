//! Error types for interpreting primitive ASN.1 content.

use thiserror::Error;

/// Reasons a primitive value with a recognized tag could not be interpreted.
///
/// These never abort decoding: [`crate::interpret`] keeps them next to the
/// raw content in [`crate::Scalar::Invalid`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // Boolean errors
    #[error("BOOLEAN: expected 1 content byte, got {0}")]
    InvalidBoolean(usize),

    // Integer errors
    #[error("INTEGER: no data")]
    IntegerNoData,

    // Null errors
    #[error("NULL: unexpected content of {0} bytes")]
    NullWithContent(usize),

    // ObjectIdentifier errors
    #[error("OBJECT IDENTIFIER: no data")]
    ObjectIdentifierNoData,
    #[error("OBJECT IDENTIFIER: incomplete encoding")]
    ObjectIdentifierIncompleteEncoding,
    #[error("OBJECT IDENTIFIER: component too large")]
    ObjectIdentifierComponentOverflow,
    #[error("OBJECT IDENTIFIER: empty string")]
    ObjectIdentifierEmptyString,
    #[error("OBJECT IDENTIFIER: invalid component '{0}'")]
    ObjectIdentifierInvalidComponent(String),

    // BitString errors
    #[error("BIT STRING: no data")]
    BitStringNoData,
    #[error("BIT STRING: unused bits {0} out of range (must be 0-7)")]
    BitStringUnusedBitsOutOfRange(u8),
    #[error("BIT STRING: {0} unused bits without payload")]
    BitStringUnusedBitsWithoutData(u8),
}
