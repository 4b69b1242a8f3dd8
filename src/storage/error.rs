use thiserror::Error;

use crate::domain::validation::ValidationError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("campaign {0} not found")]
    CampaignNotFound(String),

    #[error("music {0} not found")]
    MusicNotFound(String),

    #[error("invalid media reference '{0}'")]
    InvalidMediaRef(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("filesystem error: {0}")]
    Fs(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
