use crate::source::FetchError;
use crate::types::NodeKey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unable to fetch focus {key}: {source}")]
    FocusUnavailable {
        key: NodeKey,
        #[source]
        source: FetchError,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
