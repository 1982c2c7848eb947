use axum::{http::StatusCode, response::IntoResponse, Json};
use log::error;

use crate::core::store::StoreError;
use crate::core::tenant::ResolveError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing to")]
    MissingTo,
    #[error("Unknown Twilio number (no tenant configured)")]
    UnknownNumber,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Missing => Self::MissingTo,
            ResolveError::NotFound(_) => Self::UnknownNumber,
            ResolveError::Store(e) => Self::Store(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::MissingTo | Self::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::UnknownNumber | Self::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Store(e) => {
                error!("App API request failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
