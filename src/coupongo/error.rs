use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CouponError {
    #[error("Failed to load configuration from {}: {reason}", path.display())]
    ConfigNotLoaded { path: PathBuf, reason: String },

    #[error("Environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error("Invalid API key format: {0}")]
    InvalidApiKeyFormat(String),

    #[error("No API key found for environment '{0}'")]
    MissingApiKey(String),

    #[error("{0}")]
    Validation(String),

    #[error("Stripe API error ({status}): {error_type} - {message}")]
    Stripe {
        status: u16,
        error_type: String,
        message: String,
        code: Option<String>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection test failed: {0}")]
    ConnectionFailed(String),

    #[error("{summary}")]
    PartialBatchFailure {
        created: usize,
        requested: usize,
        summary: String,
    },

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CouponError {
    pub fn validation(message: impl Into<String>) -> Self {
        CouponError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CouponError>;
