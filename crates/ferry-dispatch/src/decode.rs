//! Turns platform messages into [`NormalizedMessage`]s before any plugin
//! sees them.

use tracing::{debug, warn};

use ferry_channels::{MessageKind, MessageType, NormalizedMessage, RawMessage, Transport};
use ferry_codec::{parse_quoted_message, CodecError};

use crate::describe::ImageDescriber;

pub const STICKER_PLACEHOLDER: &str = "[表情]";
pub const IMAGE_PLACEHOLDER: &str = "[图片]";

/// Decode `raw`, or `None` when it is of a kind the chain does not handle or
/// its body cannot be decoded.
pub async fn normalize_message(
    raw: &RawMessage,
    transport: &dyn Transport,
    resource_prefix: Option<&str>,
    describer: Option<&ImageDescriber>,
) -> Option<NormalizedMessage> {
    let (kind, text, quote, resource_url) = match raw.msg_type {
        MessageType::Text => (MessageKind::Text, raw.content.clone(), None, None),
        MessageType::Sticker => (MessageKind::Sticker, STICKER_PLACEHOLDER.to_string(), None, None),
        MessageType::App => match parse_quoted_message(&raw.content) {
            Ok(quote) => (MessageKind::Quote, quote.content.clone(), Some(quote), None),
            Err(CodecError::Parse(reason)) => {
                debug!(id = raw.id, reason = %reason, "app message is not a quote, skipping");
                return None;
            }
            Err(e) => {
                warn!(id = raw.id, error = %e, "undecodable app message, skipping");
                return None;
            }
        },
        MessageType::Image => {
            let url = match transport.download_image(raw).await {
                Ok(path) => Some(resource_url(resource_prefix, &path)),
                Err(e) => {
                    warn!(id = raw.id, error = %e, "image download failed");
                    None
                }
            };
            let text = match describer {
                Some(d) => match d.describe(raw, transport).await {
                    Some(description) => format!("{IMAGE_PLACEHOLDER}{description}"),
                    None => IMAGE_PLACEHOLDER.to_string(),
                },
                None => IMAGE_PLACEHOLDER.to_string(),
            };
            (MessageKind::Image, text, None, url)
        }
        MessageType::FriendRequest | MessageType::System => {
            debug!(id = raw.id, kind = ?raw.msg_type, "ignoring notification");
            return None;
        }
        MessageType::Other(code) => {
            warn!(id = raw.id, code, "unknown message type");
            return None;
        }
    };

    Some(NormalizedMessage {
        id: raw.id,
        kind,
        conversation: raw.conversation(),
        sender: raw.sender.clone(),
        text,
        timestamp: raw.ts,
        is_group: raw.is_group,
        quote,
        resource_url,
    })
}

/// Public URL of a downloaded file. Client paths may use backslashes.
fn resource_url(prefix: Option<&str>, path: &str) -> String {
    let relative = path.replace('\\', "/");
    let relative = relative.trim_start_matches('/');
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), relative),
        None => relative.to_string(),
    }
}
