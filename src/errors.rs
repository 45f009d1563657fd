use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("AUTH_FAILED: {0}")]
    Authentication(String),
    #[error("CONFIG_MISSING: {0}")]
    Configuration(String),
    #[error("IO_FAILURE: {0}")]
    Filesystem(String),
    #[error("PARSE_FAILED: {0}")]
    Parse(String),
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Filesystem(value.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
