use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// AppError
///
/// The failure taxonomy shared by the repository and the handlers. Every variant
/// renders as a JSON body of the shape `{ "message": "..." }`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad or missing input fields.
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Forbidden access")]
    Forbidden,

    /// The addressed product or user does not exist. Carries the entity name.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A one-per-user action was attempted twice (duplicate vote or report).
    /// Surfaced as 400 to match the status clients already handle.
    #[error("{0}")]
    Conflict(String),

    /// Any unexpected persistence failure. The detail is logged, never returned.
    #[error("store error: {0}")]
    Store(String),

    /// The object store rejected an image upload. The detail is logged; the client
    /// only sees "Upload failed".
    #[error("Upload failed")]
    Upload(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::Store(detail) => {
                tracing::error!("store failure: {}", detail);
                "Internal server error".to_string()
            }
            AppError::Upload(detail) => {
                tracing::error!("upload failure: {}", detail);
                self.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
