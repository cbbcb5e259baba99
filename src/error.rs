use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Config(String),

    /// A downstream dependency failed or answered with a non-2xx status
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Body returned to callers for every failure
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub code: &'static str,
    pub status: u16,
}

impl AppError {
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        AppError::Upstream {
            status,
            message: message.into(),
        }
    }

    /// HTTP status for this error
    ///
    /// Upstream failures mirror the provider's status when it is a real error
    /// status, otherwise they collapse to 500.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::Config(_)
            | AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Auth(_) => "AuthError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::Config(_) => "ConfigError",
            AppError::Upstream { .. } => "ApiError",
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => "AppError",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(_) => "AUTHENTICATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Config(_) => "CONFIGURATION_ERROR",
            AppError::Upstream { .. } => "API_ERROR",
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }

    /// Builds the caller-facing envelope. Driver and internal failures are
    /// reduced to a generic message; their detail only goes to the log.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            AppError::Validation(msg)
            | AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::Config(msg) => msg.clone(),
            AppError::Upstream { message, .. } => message.clone(),
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
        };

        ErrorResponse {
            error: self.name(),
            message,
            code: self.code(),
            status: self.status().as_u16(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::upstream(500, "Recipe provider request timed out")
        } else {
            let status = err.status().map(|s| s.as_u16()).unwrap_or(500);
            AppError::upstream(status, "Recipe provider request failed")
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", e))
    }
}

/// Malformed request input is reported in the regular error envelope
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = self.to_response();

        if body.status >= 500 {
            tracing::error!(error = %self, code = body.code, "Request failed");
        } else {
            tracing::debug!(error = %self, code = body.code, "Request rejected");
        }

        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
