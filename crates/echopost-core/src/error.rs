//! EchoPost error type.

use thiserror::Error;

/// Errors produced across the EchoPost workspace.
#[derive(Debug, Error)]
pub enum EchoPostError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(String),
}

/// Workspace-wide result alias.
pub type Result<T> = std::result::Result<T, EchoPostError>;
