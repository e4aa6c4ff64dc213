use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::types::RawMessage;

/// Mention target meaning "everyone in the group".
pub const MENTION_ALL: &str = "notify@all";

/// The platform client: delivers inbound messages and sends texts.
///
/// Implementations must be `Send + Sync`: the dispatcher sends from one task
/// per conversation concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stable lowercase identifier for logging.
    fn name(&self) -> &str;

    /// Start delivering inbound messages into `inbound`. Returns once the
    /// reader is running; delivery continues until [`Transport::stop`] or
    /// until the receiver is dropped.
    async fn start(&self, inbound: mpsc::Sender<RawMessage>) -> Result<(), TransportError>;

    /// Stop delivering inbound messages. Sends remain possible.
    async fn stop(&self);

    /// Send `text` to `conversation`, mentioning the given identities.
    async fn send(
        &self,
        text: &str,
        conversation: &str,
        mentions: &[String],
    ) -> Result<(), TransportError>;

    /// Download the image attached to `msg`. Returns the stored file's path
    /// relative to the client's storage root.
    async fn download_image(&self, msg: &RawMessage) -> Result<String, TransportError> {
        let _ = msg;
        Err(TransportError::Download(format!(
            "{} does not download images",
            self.name()
        )))
    }

    /// Raw bytes of the image attached to `msg`, for describing it.
    async fn fetch_image(&self, msg: &RawMessage) -> Result<Vec<u8>, TransportError> {
        let _ = msg;
        Err(TransportError::Download(format!(
            "{} does not serve image bytes",
            self.name()
        )))
    }
}

/// Render the mention header placed before a text: ` @所有人` for
/// [`MENTION_ALL`], otherwise ` @<alias>` per identity.
pub fn render_mentions(mentions: &[String], alias: impl Fn(&str) -> String) -> String {
    if mentions.iter().any(|m| m == MENTION_ALL) {
        return " @所有人".to_string();
    }
    mentions
        .iter()
        .map(|m| format!(" @{}", alias(m)))
        .collect()
}

/// Text as delivered: the mention header, a blank line, then the body.
pub fn compose_text(header: &str, text: &str) -> String {
    if header.is_empty() {
        text.to_string()
    } else {
        format!("{header}\n\n{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_all() {
        let header = render_mentions(&[MENTION_ALL.to_string()], |id| id.to_string());
        assert_eq!(header, " @所有人");
    }

    #[test]
    fn mentions_use_aliases() {
        let header = render_mentions(&["wxid_a".into(), "wxid_b".into()], |id| {
            id.trim_start_matches("wxid_").to_uppercase()
        });
        assert_eq!(header, " @A @B");
        assert_eq!(compose_text(&header, "开会"), " @A @B\n\n开会");
    }

    #[test]
    fn no_mentions_is_plain_text() {
        assert_eq!(render_mentions(&[], |id| id.to_string()), "");
        assert_eq!(compose_text("", "hi"), "hi");
    }
}
