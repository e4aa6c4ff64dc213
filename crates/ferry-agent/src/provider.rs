use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::postprocess;

/// A single message sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Request to a chat-completion backend.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Overrides the backend's configured model when set.
    pub model: Option<String>,
    pub system: String,
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// System prompt plus one user turn, which is how every chat call is shaped.
    pub fn single_turn(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: None,
            system: system.into(),
            messages: vec![Message {
                role: Role::User,
                content: user.into(),
            }],
        }
    }
}

/// Request to describe one image.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub image: Vec<u8>,
}

/// A concrete model endpoint. Returns the raw completion text; shaping the
/// text into replies is [`AiProvider`]'s job.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logging and error messages.
    fn name(&self) -> &str;

    async fn complete(&self, req: &ChatRequest) -> Result<String, ProviderError>;

    /// Backends without a vision model return `Unsupported`.
    async fn describe_image(&self, req: &ImageRequest) -> Result<String, ProviderError> {
        let _ = req;
        Err(ProviderError::Unsupported(format!(
            "{} cannot describe images",
            self.name()
        )))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// The capability plugins talk to. Wraps any backend (or a router of them)
/// and applies the same output contract to all of them.
#[derive(Clone)]
pub struct AiProvider {
    backend: Arc<dyn ChatBackend>,
}

impl AiProvider {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    /// Ask for a reply to `message` under the system `prompt`.
    ///
    /// `Ok(None)` means the model chose to stay silent this turn, or left
    /// nothing to send once post-processing was done.
    pub async fn chat(
        &self,
        prompt: &str,
        message: &str,
        self_name: &str,
    ) -> Result<Option<Vec<String>>, ProviderError> {
        let raw = self
            .backend
            .complete(&ChatRequest::single_turn(prompt, message))
            .await?;
        debug!(backend = %self.name(), response = ?raw, "chat completion");
        Ok(postprocess::shape_reply(&raw, self_name))
    }

    pub async fn describe_image(
        &self,
        prompt: &str,
        image: &[u8],
    ) -> Result<Option<String>, ProviderError> {
        let raw = self
            .backend
            .describe_image(&ImageRequest {
                prompt: prompt.to_string(),
                image: image.to_vec(),
            })
            .await?;
        debug!(backend = %self.name(), response = ?raw, "image description");
        let cleaned = postprocess::clean_image_description(&raw);
        Ok((!cleaned.is_empty()).then_some(cleaned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(&'static str);

    #[async_trait]
    impl ChatBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn complete(&self, _req: &ChatRequest) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl ChatBackend for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        async fn complete(&self, _req: &ChatRequest) -> Result<String, ProviderError> {
            Err(ProviderError::Unavailable("down".into()))
        }
    }

    fn provider(raw: &'static str) -> AiProvider {
        AiProvider::new(Arc::new(Scripted(raw)))
    }

    #[tokio::test]
    async fn abstain_phrase_yields_none() {
        let reply = provider("本轮不发言").chat("p", "m", "Bot").await.unwrap();
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn reasoning_trace_is_stripped() {
        let reply = provider("<think>reasoning</think>X\nHello")
            .chat("p", "m", "Bot")
            .await
            .unwrap();
        assert_eq!(reply, Some(vec!["Hello".to_string()]));
    }

    #[tokio::test]
    async fn own_name_prefix_is_stripped() {
        let reply = provider("Bot: hi").chat("p", "m", "Bot").await.unwrap();
        assert_eq!(reply, Some(vec!["hi".to_string()]));
    }

    #[tokio::test]
    async fn backend_errors_propagate() {
        let p = AiProvider::new(Arc::new(Broken));
        assert!(matches!(
            p.chat("p", "m", "Bot").await,
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn describe_image_defaults_to_unsupported() {
        let p = provider("ignored");
        assert!(matches!(
            p.describe_image("what is this", b"\x89PNG").await,
            Err(ProviderError::Unsupported(_))
        ));
    }
}
