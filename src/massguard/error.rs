use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Nesting depth {actual} exceeds maximum {max}")]
    DepthExceeded { max: usize, actual: usize },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("Invalid whitelist spec: {0}")]
    InvalidSpec(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GuardError>;
