//! API error taxonomy and its mapping onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Every failure a request can end in.
///
/// Expected user-input failures carry their own variant so clients can branch
/// on `error`; anything else is `Internal` and is never echoed back.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("CSV file is empty")]
    EmptyFile,

    #[error("CSV file must have at least {required} columns, found {found}")]
    TooFewColumns { required: usize, found: usize },

    #[error("CSV file must have at least {required} numeric columns, found {found}")]
    TooFewNumericColumns { required: usize, found: usize },

    #[error("Malformed CSV: {0}")]
    MalformedCsv(String),

    #[error("Column '{0}' not found in file")]
    ColumnNotFound(String),

    #[error("File not found")]
    FileNotFound,

    #[error("File exceeds the maximum size of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Only CSV files are allowed")]
    UnsupportedFileType,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateEmail
            | Self::InvalidInput(_)
            | Self::EmptyFile
            | Self::TooFewColumns { .. }
            | Self::TooFewNumericColumns { .. }
            | Self::MalformedCsv(_)
            | Self::ColumnNotFound(_)
            | Self::UnsupportedFileType => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateEmail => "DuplicateEmail",
            Self::InvalidInput(_) => "InvalidInput",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::InvalidToken => "InvalidToken",
            Self::EmptyFile => "EmptyFile",
            Self::TooFewColumns { .. } => "TooFewColumns",
            Self::TooFewNumericColumns { .. } => "TooFewNumericColumns",
            Self::MalformedCsv(_) => "MalformedCsv",
            Self::ColumnNotFound(_) => "ColumnNotFound",
            Self::FileNotFound => "FileNotFound",
            Self::PayloadTooLarge { .. } => "PayloadTooLarge",
            Self::UnsupportedFileType => "UnsupportedFileType",
            Self::Internal(_) => "Internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AppError::DuplicateEmail.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::EmptyFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::ColumnNotFound("z".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::FileNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::PayloadTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let resp = AppError::Internal(anyhow::anyhow!("password=hunter2 at db")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("\"error\":\"Internal\""));
    }

    #[tokio::test]
    async fn client_errors_carry_kind_and_message() {
        let resp = AppError::ColumnNotFound("z".into()).into_response();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "ColumnNotFound");
        assert_eq!(json["message"], "Column 'z' not found in file");
    }
}
