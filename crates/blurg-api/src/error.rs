use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use blurg_core::protocol::{
    StatusResponse, ERROR_BAD_ID, ERROR_BAD_KEY, ERROR_BAD_NAME, ERROR_BAD_REQUEST,
    ERROR_INTERNAL, ERROR_NO_DIARY,
};
use blurg_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Invalid diary name: {0}")]
    BadName(String),
    #[error("Unauthorized: {0}")]
    BadKey(String),
    #[error("Diary no longer exists")]
    NoDiary,
    #[error("No such entry: {0}")]
    BadId(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn bad_key(message: impl Into<String>) -> Self {
        Self::BadKey(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    const fn error_type(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => ERROR_BAD_REQUEST,
            Self::BadName(_) => ERROR_BAD_NAME,
            Self::BadKey(_) => ERROR_BAD_KEY,
            Self::NoDiary => ERROR_NO_DIARY,
            Self::BadId(_) => ERROR_BAD_ID,
            Self::Internal(_) => ERROR_INTERNAL,
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::BadName(_) => StatusCode::BAD_REQUEST,
            Self::BadKey(_) => StatusCode::UNAUTHORIZED,
            Self::NoDiary | Self::BadId(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Storage errors from a diary that is known to exist. `NotFound` there can
/// only mean a missing entry.
impl From<blurg_core::Error> for AppError {
    fn from(error: blurg_core::Error) -> Self {
        match error.kind() {
            ErrorKind::NotFound => Self::BadId(error.to_string()),
            ErrorKind::InvalidInput => Self::BadRequest(error.to_string()),
            ErrorKind::InvalidName => Self::BadName(error.to_string()),
            _ => Self::Internal(error.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = StatusResponse::error(self.error_type()).with_message(self.to_string());
        (status, Json(body)).into_response()
    }
}
