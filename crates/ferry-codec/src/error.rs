use thiserror::Error;

/// Errors produced while decoding platform payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The bytes or markup are truncated, malformed, or not valid UTF-8.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The payload is well-formed but not what the caller asked for
    /// (wrong message sub-type, missing field).
    #[error("Parse error: {0}")]
    Parse(String),
}
