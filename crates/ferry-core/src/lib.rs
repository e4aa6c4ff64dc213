pub mod config;
pub mod error;
pub mod types;

pub use config::FerryConfig;
pub use error::{FerryError, Result};
pub use types::ConversationId;
