use thiserror::Error;

#[derive(Error, Debug)]
pub enum OdrnaError {
    #[error("LLM not configured: {0}")]
    LlmNotConfigured(String),

    #[error("LLM rejected the API key (HTTP {status})")]
    LlmUnauthorized { status: u16 },

    #[error("LLM API error (HTTP {status}): {body}")]
    LlmHttp { status: u16, body: String },

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Unusable LLM reply: {0}")]
    LlmMalformed(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid backup: {0}")]
    Backup(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl OdrnaError {
    /// Whether the failure happened before reaching the remote service
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OdrnaError::LlmNotConfigured(_) | OdrnaError::LlmUnauthorized { .. } | OdrnaError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OdrnaError>;
