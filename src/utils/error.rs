use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Repository error: {message}")]
    RepositoryError { message: String },

    #[error("Stage '{stage}' failed: {details}")]
    StageError { stage: String, details: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn repository(message: impl Into<String>) -> Self {
        Self::RepositoryError {
            message: message.into(),
        }
    }

    /// 對應的 HTTP 狀態碼
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::RepositoryError { .. }
            | AppError::StageError { .. }
            | AppError::IoError(_)
            | AppError::SerializationError(_)
            | AppError::ConfigError { .. }
            | AppError::InvalidConfigValueError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client errors are the caller's fault and are not worth an error-level log line.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_client_error() {
            tracing::warn!("⚠️ Request rejected ({}): {}", status.as_u16(), self);
        } else {
            tracing::error!("❌ Request failed ({}): {}", status.as_u16(), self);
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::bad_request("Missing Data").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::not_found("Reservation 7 cannot be found.").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::repository("lock poisoned").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_messages_are_rendered_verbatim() {
        let err = AppError::bad_request("invalid status archived");
        assert_eq!(err.to_string(), "invalid status archived");
        assert!(err.is_client_error());
    }
}
