//! Error types.

use thiserror::Error;

/// Inbound frame could not be understood.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Binary frames are not supported")]
    Binary,
}

/// The attack-text collaborator failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    #[error("Generator returned no usable text")]
    Empty,
}

/// Server failed to start.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
