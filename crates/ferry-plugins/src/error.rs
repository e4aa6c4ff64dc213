use ferry_agent::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Prompt template error: {0}")]
    Template(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
