//! Optional image descriptions for the history text of image messages.

use tracing::{debug, warn};

use ferry_agent::prompt::DEFAULT_IMAGE_PROMPT;
use ferry_agent::AiProvider;
use ferry_channels::{RawMessage, Transport};

pub struct ImageDescriber {
    provider: AiProvider,
    prompt: String,
}

impl ImageDescriber {
    pub fn new(provider: AiProvider) -> Self {
        Self {
            provider,
            prompt: DEFAULT_IMAGE_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Fetch the image behind `raw` and describe it. Any failure is logged
    /// and yields `None`; the message still goes through as a placeholder.
    pub async fn describe(&self, raw: &RawMessage, transport: &dyn Transport) -> Option<String> {
        let bytes = match transport.fetch_image(raw).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(id = raw.id, error = %e, "could not fetch image for description");
                return None;
            }
        };
        match self.provider.describe_image(&self.prompt, &bytes).await {
            Ok(Some(description)) => {
                debug!(id = raw.id, %description, "image described");
                Some(description)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(id = raw.id, provider = %self.provider.name(), error = %e, "image description failed");
                None
            }
        }
    }
}
