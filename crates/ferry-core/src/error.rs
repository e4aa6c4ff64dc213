use thiserror::Error;

#[derive(Debug, Error)]
pub enum FerryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FerryError {
    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            FerryError::Config(_) => "CONFIG_ERROR",
            FerryError::Serialization(_) => "SERIALIZATION_ERROR",
            FerryError::Io(_) => "IO_ERROR",
            FerryError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, FerryError>;
