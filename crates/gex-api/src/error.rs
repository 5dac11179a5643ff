//! API error handling

use crate::handlers::gremlin::QueryEntry;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gex_core::ConnectionError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Body returned when a batch stopped before every statement ran
#[derive(Debug, Serialize, ToSchema)]
pub struct PartialFailure {
    #[serde(flatten)]
    pub error: ApiError,
    /// Outcomes produced before the batch stopped
    pub results: Vec<QueryEntry>,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Session target misconfigured
    Configuration(String),
    /// Session could not be established; no query ran
    Connection(String),
    /// Connection lost mid-batch; earlier outcomes are kept
    Transport {
        message: String,
        results: Vec<QueryEntry>,
    },
    /// Request deadline reached mid-batch; earlier outcomes are kept
    Timeout {
        message: String,
        results: Vec<QueryEntry>,
    },
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("CONFIGURATION_ERROR", "Graph endpoint is not configured")
                    .with_details(msg),
            ),
            AppError::Connection(msg) => (
                StatusCode::BAD_GATEWAY,
                ApiError::new("CONNECTION_ERROR", "Failed to open graph session").with_details(msg),
            ),
            AppError::Transport { message, results } => {
                let body = PartialFailure {
                    error: ApiError::new("TRANSPORT_ERROR", "Graph connection lost mid-batch")
                        .with_details(message),
                    results,
                };
                return (StatusCode::BAD_GATEWAY, Json(body)).into_response();
            }
            AppError::Timeout { message, results } => {
                let body = PartialFailure {
                    error: ApiError::new("BATCH_TIMEOUT", "Request deadline reached mid-batch")
                        .with_details(message),
                    results,
                };
                return (StatusCode::GATEWAY_TIMEOUT, Json(body)).into_response();
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal_error().with_details(msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<ConnectionError> for AppError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::InvalidTarget(e) => AppError::Configuration(e.to_string()),
            other => AppError::Connection(other.to_string()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
