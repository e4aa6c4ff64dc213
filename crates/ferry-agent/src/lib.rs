pub mod ollama;
pub mod openai;
pub mod postprocess;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod router;

pub use provider::{AiProvider, ChatBackend, ChatRequest, ImageRequest, ProviderError};
