//! Error types for AnswerForge services
//!
//! Collaborator errors (embedding, language model, knowledge store) are
//! absorbed by the resolution pipeline and never reach callers of `/v1/ask`.
//! What does reach HTTP clients is rendered as
//! `{"error": {"code": .., "message": .., "details": ..}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error codes
///
/// The numeric form groups codes by family: 1xxx request, 4xxx missing
/// resource, 6xxx throttling, 7xxx knowledge store, 8xxx upstream
/// collaborators, 9xxx internal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    SessionNotFound,
    RateLimited,
    KnowledgeStoreError,
    EmbeddingError,
    LanguageModelError,
    InternalError,
    ConfigurationError,
    SerializationError,
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::SessionNotFound => 4005,
            ErrorCode::RateLimited => 6001,
            ErrorCode::KnowledgeStoreError => 7001,
            ErrorCode::EmbeddingError => 8003,
            ErrorCode::LanguageModelError => 8004,
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    #[error("Knowledge store error: {message}")]
    KnowledgeStore { message: String },

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Language model error: {message}")]
    LanguageModel { message: String },

    /// Upstream asked us to back off (429/503)
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::KnowledgeStore { .. } => ErrorCode::KnowledgeStoreError,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::LanguageModel { .. } => ErrorCode::LanguageModelError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Internal { .. } | AppError::Other(_) => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::EmbeddingError { .. } | AppError::LanguageModel { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::KnowledgeStore { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Error body returned to HTTP clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(error = %message, code = ?code, status = status.as_u16(), "Server error");
        } else {
            tracing::warn!(error = %message, code = ?code, status = status.as_u16(), "Client error");
        }

        let details = match &self {
            AppError::Validation { field: Some(field), .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::SessionNotFound { id: "abc".into() };
        assert_eq!(err.code(), ErrorCode::SessionNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code().as_code(), 4005);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "question too long".into(),
            field: Some("question".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_upstream_errors() {
        let err = AppError::LanguageModel {
            message: "boom".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_server_error());

        let err = AppError::ServiceUnavailable {
            message: "rate limited".into(),
        };
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_value(ErrorCode::SessionNotFound).unwrap();
        assert_eq!(json, "SESSION_NOT_FOUND");
    }
}
