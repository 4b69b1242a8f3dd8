use rouille::Response;

use crate::storage::error::StorageError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::CampaignNotFound(_) | StorageError::MusicNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }

            StorageError::InvalidMediaRef(_) | StorageError::Validation(_) => {
                ApiError::BadRequest(err.to_string())
            }

            StorageError::Database(_)
            | StorageError::Serialization(_)
            | StorageError::Fs(_)
            | StorageError::Internal(_) => {
                log::error!("request failed: {err}");
                ApiError::Internal("internal server error".into())
            }
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) | ApiError::Internal(msg) => {
                Response::text(msg).with_status_code(status)
            }
        }
    }
}
