use crate::subtitle::Format;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubtrackError {
    #[error("Malformed {format} input: {reason}")]
    MalformedInput {
        format: Format,
        reason: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Timestamp fields were never set")]
    TimeNotSet,

    #[error("Frame values were never set")]
    FramesNotValid,

    #[error("Truncated packet: expected {expected} bytes, {available} available")]
    Truncated { expected: usize, available: usize },

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SubtrackError {
    pub fn malformed(format: Format, reason: impl Into<String>) -> Self {
        SubtrackError::MalformedInput {
            format,
            reason: reason.into(),
            cause: None,
        }
    }

    pub fn malformed_with<E>(format: Format, reason: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SubtrackError::MalformedInput {
            format,
            reason: reason.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

pub type Result<T> = std::result::Result<T, SubtrackError>;
