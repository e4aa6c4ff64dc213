//! Block-compressed message bodies (LZ4 block format, no size header).

use crate::error::CodecError;
use crate::payload::Payload;

/// The codec does not record the uncompressed size, so the output buffer is
/// over-allocated at this multiple of the input length.
pub const SIZE_FACTOR: usize = 1024;

/// Hard ceiling for the output buffer, whatever the input length.
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

/// Decompress a stored message body into text.
///
/// NUL padding that the platform leaves in the decoded body is removed.
pub fn decode_compressed_content<'a>(data: impl Into<Payload<'a>>) -> Result<String, CodecError> {
    let binary = data.into().to_bytes()?;
    if binary.is_empty() {
        return Err(CodecError::Decode("empty compressed payload".into()));
    }

    let capacity = binary
        .len()
        .saturating_mul(SIZE_FACTOR)
        .min(MAX_OUTPUT_BYTES);
    let raw = lz4_flex::block::decompress(&binary, capacity)
        .map_err(|e| CodecError::Decode(format!("decompression failed: {e}")))?;

    let text = String::from_utf8(raw)
        .map_err(|e| CodecError::Decode(format!("decompressed body is not UTF-8: {e}")))?;
    Ok(text.replace('\0', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_trailing_nul() {
        let compressed = lz4_flex::block::compress(b"<msg>hello</msg>\n\0");
        let text = decode_compressed_content(&compressed).unwrap();
        assert_eq!(text, "<msg>hello</msg>\n");
    }

    #[test]
    fn garbage_is_decode_error() {
        let garbage: &[u8] = &[0xff, 0x00, 0x01];
        assert!(matches!(
            decode_compressed_content(garbage),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn empty_is_decode_error() {
        assert!(decode_compressed_content("").is_err());
    }
}
