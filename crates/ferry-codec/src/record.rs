//! Persisted message rows, as read from the platform's message database.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::extension::decode_sender_id;
use crate::markup::decode_quoted_message;

pub const TYPE_TEXT: u32 = 1;
pub const TYPE_APP: u32 = 49;
pub const SUB_TYPE_QUOTE: u32 = 57;

/// One row of the message table. Binary columns arrive base64-encoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoredMessage {
    pub is_sender: i32,
    #[serde(default)]
    pub bytes_extra: String,
    #[serde(default)]
    pub compress_content: String,
    #[serde(default)]
    pub str_content: String,
    #[serde(rename = "Type")]
    pub msg_type: u32,
    #[serde(default)]
    pub sub_type: u32,
    pub create_time: i64,
}

/// A stored row reduced to who said what, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    /// Platform identity of the author (not yet a display name).
    pub sender: String,
    pub text: String,
    pub timestamp: i64,
}

/// Decode a stored row belonging to `conversation`.
///
/// `Ok(None)` means the row is of a kind history does not keep (media,
/// system notices, bodies that are still markup). Errors mean the row was
/// supposed to be decodable and was not; callers skip it either way.
pub fn decode_stored_message(
    row: &StoredMessage,
    conversation: &str,
    self_id: &str,
) -> Result<Option<DecodedRow>, CodecError> {
    let is_group = conversation.ends_with("@chatroom");
    let sender = if row.is_sender == 1 {
        self_id.to_string()
    } else if is_group {
        decode_sender_id(row.bytes_extra.as_str())?
    } else {
        conversation.to_string()
    };

    let text = match (row.msg_type, row.sub_type) {
        (TYPE_TEXT, _) => row.str_content.clone(),
        (TYPE_APP, SUB_TYPE_QUOTE) => decode_quoted_message(row.compress_content.as_str())?.content,
        _ => return Ok(None),
    };

    // Some text rows still carry raw markup; history has no use for them.
    if text.starts_with('<') {
        return Ok(None);
    }

    Ok(Some(DecodedRow {
        sender,
        text,
        timestamp: row.create_time,
    }))
}
