use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix the platform appends to group conversation identifiers.
pub const GROUP_SUFFIX: &str = "@chatroom";

/// Prefix of personal (non-official-account) user identifiers.
pub const USER_PREFIX: &str = "wxid_";

/// Opaque key identifying a group or one-to-one chat.
///
/// For one-to-one chats this is the peer's identity; for groups it ends in
/// [`GROUP_SUFFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_group(&self) -> bool {
        self.0.ends_with(GROUP_SUFFIX)
    }

    /// Whether the id names a real person or group, as opposed to an official
    /// account or a system conversation. Used to filter startup preloading.
    pub fn is_chat(&self) -> bool {
        self.0.starts_with(USER_PREFIX) || self.is_group()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Current wall-clock time as Unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
