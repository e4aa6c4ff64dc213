use thiserror::Error;

/// Errors raised by the platform-facing collaborators.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The platform client could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A text could not be delivered.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Stored history or session lists could not be queried.
    #[error("History query failed: {0}")]
    History(String),

    /// A media attachment could not be fetched.
    #[error("Download failed: {0}")]
    Download(String),

    /// The transport has been shut down.
    #[error("Transport closed")]
    Closed,
}
