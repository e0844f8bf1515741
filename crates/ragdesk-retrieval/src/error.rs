use ragdesk_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Unsupported file type: .{0}")]
    UnsupportedFileType(String),

    #[error("Failed to parse {filename}: {reason}")]
    Parse { filename: String, reason: String },

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No text could be extracted from {0}")]
    EmptyDocument(String),

    #[error("Access to the default knowledge base is not granted for user {0}")]
    AccessDenied(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Re-ranking failed: {0}")]
    Rerank(String),

    #[error(transparent)]
    Store(#[from] PersistError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
