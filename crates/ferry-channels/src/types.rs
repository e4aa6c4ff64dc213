use serde::{Deserialize, Serialize};

use ferry_codec::QuotedMessage;
use ferry_core::ConversationId;

/// Platform message type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum MessageType {
    Text,
    Image,
    FriendRequest,
    Sticker,
    /// App messages; sub-type 57 is a quoted reply.
    App,
    System,
    Other(u32),
}

impl From<u32> for MessageType {
    fn from(code: u32) -> Self {
        match code {
            1 => MessageType::Text,
            3 => MessageType::Image,
            37 => MessageType::FriendRequest,
            47 => MessageType::Sticker,
            49 => MessageType::App,
            10000 => MessageType::System,
            other => MessageType::Other(other),
        }
    }
}

impl From<MessageType> for u32 {
    fn from(t: MessageType) -> Self {
        match t {
            MessageType::Text => 1,
            MessageType::Image => 3,
            MessageType::FriendRequest => 37,
            MessageType::Sticker => 47,
            MessageType::App => 49,
            MessageType::System => 10000,
            MessageType::Other(code) => code,
        }
    }
}

/// A message exactly as the platform client delivers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Platform message id.
    pub id: u64,

    #[serde(rename = "type")]
    pub msg_type: MessageType,

    /// Identity of the author.
    pub sender: String,

    /// Conversation the message belongs to: the group id, or the peer's
    /// identity in a one-to-one chat.
    pub room_id: String,

    /// Text body, or markup for app messages.
    pub content: String,

    /// Unix seconds.
    pub ts: i64,

    /// Set when the bot account itself authored the message.
    #[serde(default)]
    pub is_self: bool,

    /// Set when the message arrived in a group.
    #[serde(default)]
    pub is_group: bool,

    /// Attachment handle used to download media (image path on the client).
    #[serde(default)]
    pub extra: String,
}

impl RawMessage {
    pub fn conversation(&self) -> ConversationId {
        ConversationId::new(self.room_id.clone())
    }

    /// Convenience constructor for a plain text message.
    pub fn text(
        room_id: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
        ts: i64,
    ) -> Self {
        let room_id = room_id.into();
        Self {
            id: 0,
            msg_type: MessageType::Text,
            sender: sender.into(),
            is_group: room_id.ends_with(ferry_core::types::GROUP_SUFFIX),
            room_id,
            content: content.into(),
            ts,
            is_self: false,
            extra: String::new(),
        }
    }
}

/// What a normalized message carries, after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    /// A reply quoting an earlier message. `text` holds the visible reply.
    Quote,
    /// `text` is the sticker placeholder.
    Sticker,
    /// `text` is the image placeholder; `resource_url` points at the file
    /// when it could be fetched.
    Image,
}

impl MessageKind {
    /// Kinds whose text was written by a person (as opposed to placeholders).
    pub fn is_textual(self) -> bool {
        matches!(self, MessageKind::Text | MessageKind::Quote)
    }
}

/// The one message shape plugins see. Produced once by the decoding stage.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedMessage {
    pub id: u64,
    pub kind: MessageKind,
    pub conversation: ConversationId,
    /// Identity of the author.
    pub sender: String,
    /// Text as it is stored in history.
    pub text: String,
    pub timestamp: i64,
    pub is_group: bool,
    pub quote: Option<QuotedMessage>,
    pub resource_url: Option<String>,
}
