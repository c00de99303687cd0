use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
