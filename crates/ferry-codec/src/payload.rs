use std::borrow::Cow;

use base64::Engine;

use crate::error::CodecError;

/// Input accepted by the binary decoders: either base64 text (as stored in
/// the message database) or the raw bytes.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Base64(&'a str),
    Bytes(&'a [u8]),
}

impl<'a> Payload<'a> {
    /// Resolve to raw bytes, decoding base64 when needed.
    pub fn to_bytes(self) -> Result<Cow<'a, [u8]>, CodecError> {
        match self {
            Payload::Bytes(b) => Ok(Cow::Borrowed(b)),
            Payload::Base64(s) => base64::engine::general_purpose::STANDARD
                .decode(s.trim())
                .map(Cow::Owned)
                .map_err(|e| CodecError::Decode(format!("invalid base64: {e}"))),
        }
    }
}

impl<'a> From<&'a str> for Payload<'a> {
    fn from(s: &'a str) -> Self {
        Payload::Base64(s)
    }
}

impl<'a> From<&'a String> for Payload<'a> {
    fn from(s: &'a String) -> Self {
        Payload::Base64(s.as_str())
    }
}

impl<'a> From<&'a [u8]> for Payload<'a> {
    fn from(b: &'a [u8]) -> Self {
        Payload::Bytes(b)
    }
}

impl<'a> From<&'a Vec<u8>> for Payload<'a> {
    fn from(b: &'a Vec<u8>) -> Self {
        Payload::Bytes(b.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_is_decoded() {
        let bytes = Payload::from("aGVsbG8=").to_bytes().unwrap();
        assert_eq!(bytes.as_ref(), b"hello");
    }

    #[test]
    fn raw_bytes_pass_through() {
        let raw = vec![1u8, 2, 3];
        let bytes = Payload::from(&raw).to_bytes().unwrap();
        assert!(matches!(bytes, Cow::Borrowed(_)));
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn bad_base64_is_decode_error() {
        let err = Payload::from("not base64!!").to_bytes().unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
