use thiserror::Error;

/// Error types for translation backends
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MtError {
    /// The backend rejected or failed the request
    #[error("Translation error: {0}")]
    Translation(String),
    /// Transport-level failure talking to the backend
    #[error("Network error: {0}")]
    Network(String),
    /// Retries were exhausted while the backend kept rate limiting
    #[error("Rate limit still exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },
    /// Missing or invalid backend configuration (API key, client setup)
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid locale: {0}")]
    InvalidLocale(String),
}

impl From<reqwest::Error> for MtError {
    fn from(error: reqwest::Error) -> Self {
        MtError::Network(error.to_string())
    }
}

/// Result type for MT operations
pub type MtResult<T> = Result<T, MtError>;
