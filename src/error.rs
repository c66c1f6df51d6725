//! Error types for the wirepack codec

use thiserror::Error;

/// Errors that can occur during encoding, decoding or definition setup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Output buffer too small for the value being encoded
    #[error("buffer too small for operation")]
    ShortBuffer,
    /// Input ended before the declared fields were read
    #[error("unexpected end of message data")]
    UnexpectedEof,
    /// VarInt ran past the 10-byte cap (strict codecs only)
    #[error("varint exceeds 64 bits")]
    VarIntOverflow,
    /// A value of the wrong kind was handed to a codec
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Codec name
        expected: &'static str,
        /// Kind of the offending value
        found: &'static str,
    },
    /// Record is missing a field the definition declares
    #[error("missing field `{0}`")]
    MissingField(String),
    /// Field order is not a permutation of the layout's field names
    #[error("invalid field order: {0}")]
    FieldOrder(String),
    /// UTF-8 string codec read bytes that are not valid UTF-8
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
    /// A codec with a computed size did not override `size_of`
    #[error("codec `{0}` has no size rule for values")]
    Unsized(&'static str),
    /// Array element codec writes no bytes, so counts cannot be bounded
    #[error("array element codec `{0}` has zero width")]
    ZeroWidth(&'static str),
    /// Two packet definitions share one identifier
    #[error("packet id {0} already registered")]
    DuplicateId(u64),
    /// Message identifier differs from the definition decoding it
    #[error("expected packet id {expected}, found {found}")]
    IdMismatch {
        /// Identifier of the definition
        expected: u64,
        /// Identifier read from the buffer
        found: u64,
    },
    /// No definition registered for the identifier being encoded
    #[error("packet id {0} is not registered")]
    Unregistered(u64),
    /// Message decoded without consuming the whole buffer
    #[error("message consumed {consumed} of {len} bytes")]
    TrailingBytes {
        /// Bytes read by the definition
        consumed: usize,
        /// Length of the buffer
        len: usize,
    },
}

/// Result type alias for wirepack operations
pub type Result<T> = core::result::Result<T, Error>;
