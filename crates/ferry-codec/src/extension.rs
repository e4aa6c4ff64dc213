//! Extension blobs: a protobuf message with two repeated groups, `flags`
//! (code → int64) and `strings` (code → string).

use std::collections::BTreeMap;
use std::fmt;

use prost::Message;
use serde::Serialize;

use crate::error::CodecError;
use crate::payload::Payload;

/// Field code carrying the original sender inside a group relay.
pub const SENDER_CODE: &str = "1";

#[derive(Clone, PartialEq, Message)]
pub struct ExtensionBlob {
    #[prost(message, repeated, tag = "1")]
    pub flags: Vec<FlagEntry>,
    #[prost(message, repeated, tag = "3")]
    pub strings: Vec<StringEntry>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FlagEntry {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(int64, tag = "2")]
    pub value: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct StringEntry {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtensionValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for ExtensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionValue::Int(v) => write!(f, "{v}"),
            ExtensionValue::Text(s) => f.write_str(s),
        }
    }
}

/// Both repeated groups merged into one map keyed by the field code.
/// When a code appears in both groups the string entry wins.
pub type DecodedExtension = BTreeMap<String, ExtensionValue>;

/// Decode an extension blob from base64 text or raw bytes.
pub fn decode_extension<'a>(data: impl Into<Payload<'a>>) -> Result<DecodedExtension, CodecError> {
    let binary = data.into().to_bytes()?;
    let blob = ExtensionBlob::decode(binary.as_ref())
        .map_err(|e| CodecError::Decode(format!("malformed extension blob: {e}")))?;

    let mut attrs = DecodedExtension::new();
    for flag in blob.flags {
        attrs.insert(flag.code.to_string(), ExtensionValue::Int(flag.value));
    }
    for entry in blob.strings {
        attrs.insert(entry.code.to_string(), ExtensionValue::Text(entry.value));
    }
    Ok(attrs)
}

/// Return the original sender identity embedded in a relayed group message.
pub fn decode_sender_id<'a>(data: impl Into<Payload<'a>>) -> Result<String, CodecError> {
    decode_extension(data)?
        .remove(SENDER_CODE)
        .map(|v| v.to_string())
        .ok_or_else(|| CodecError::Decode("extension blob has no sender field".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(flags: &[(i32, i64)], strings: &[(i32, &str)]) -> Vec<u8> {
        ExtensionBlob {
            flags: flags
                .iter()
                .map(|&(code, value)| FlagEntry { code, value })
                .collect(),
            strings: strings
                .iter()
                .map(|&(code, value)| StringEntry {
                    code,
                    value: value.to_string(),
                })
                .collect(),
        }
        .encode_to_vec()
    }

    #[test]
    fn merges_both_groups() {
        let bytes = blob(&[(16, 0), (9, -3)], &[(1, "wxid_a"), (2, "hash")]);
        let decoded = decode_extension(&bytes).unwrap();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded["16"], ExtensionValue::Int(0));
        assert_eq!(decoded["9"], ExtensionValue::Int(-3));
        assert_eq!(decoded["1"], ExtensionValue::Text("wxid_a".into()));
    }

    #[test]
    fn string_entry_overrides_flag_with_same_code() {
        let bytes = blob(&[(1, 42)], &[(1, "wxid_a")]);
        assert_eq!(decode_sender_id(&bytes).unwrap(), "wxid_a");
    }

    #[test]
    fn empty_input_is_an_empty_map() {
        assert!(decode_extension(&[] as &[u8]).unwrap().is_empty());
    }

    #[test]
    fn missing_sender_is_decode_error() {
        let bytes = blob(&[(16, 0)], &[(2, "hash")]);
        assert!(matches!(
            decode_sender_id(&bytes),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn truncated_buffer_is_decode_error() {
        let bytes = blob(&[], &[(1, "wxid_kf7zbyjjxs8r22")]);
        let truncated = &bytes[..bytes.len() - 5];
        assert!(matches!(
            decode_extension(truncated),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn decoding_is_deterministic() {
        let bytes = blob(&[(3, 7)], &[(1, "x"), (7, "<msgsource />")]);
        assert_eq!(
            decode_extension(&bytes).unwrap(),
            decode_extension(&bytes).unwrap()
        );
    }
}
