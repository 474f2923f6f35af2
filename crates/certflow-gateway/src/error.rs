use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use certflow_core::error::CertflowError;

/// Error surfaced to HTTP callers as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ApiError::BadRequest(d) | ApiError::PayloadTooLarge(d) | ApiError::Internal(d) => d,
        }
    }
}

impl From<CertflowError> for ApiError {
    fn from(e: CertflowError) -> Self {
        match e {
            CertflowError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(e.body_text())
        } else {
            ApiError::BadRequest(format!("malformed multipart body: {}", e.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), detail = %self.detail(), "Validation request failed");
        }
        (status, Json(serde_json::json!({ "detail": self.detail() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_maps_to_400() {
        let err = ApiError::from(CertflowError::InvalidRequest("only PDF files".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "only PDF files");
    }

    #[test]
    fn test_run_failures_map_to_500() {
        let err = ApiError::from(CertflowError::NodeTimeout {
            node: "validate_page".into(),
            timeout_secs: 5,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail().contains("validate_page"));

        let err = ApiError::from(CertflowError::collaborator("logo", "HTTP 503"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
