//! Gateway error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pidima_kernel::gateway::{AuthError, DownstreamError};
use serde_json::json;
use thiserror::Error;

/// Runtime gateway errors, each rendered as `{"error": code, "message": text}`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Admission refused the request.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("refresh token cookie is missing")]
    MissingRefreshToken,

    #[error("refresh token is invalid or expired")]
    InvalidRefreshToken,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no route for '{0}'")]
    NotFound(String),

    #[error("method '{0}' is not supported")]
    MethodNotAllowed(String),

    #[error(transparent)]
    Upstream(#[from] DownstreamError),

    /// Startup configuration is unusable.
    #[error(transparent)]
    Config(#[from] pidima_kernel::gateway::GatewayError),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Auth(err) => err.code(),
            GatewayError::InvalidCredentials => "invalid_credentials",
            GatewayError::MissingRefreshToken => "missing_refresh_token",
            GatewayError::InvalidRefreshToken => "invalid_refresh_token",
            GatewayError::RateLimited => "rate_limited",
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::MethodNotAllowed(_) => "method_not_allowed",
            GatewayError::Upstream(_) => "bad_gateway",
            GatewayError::Config(_)
            | GatewayError::HttpClient(_)
            | GatewayError::Io(_)
            | GatewayError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Auth(err) => {
                StatusCode::from_u16(err.status()).unwrap_or(StatusCode::UNAUTHORIZED)
            }
            GatewayError::InvalidCredentials
            | GatewayError::MissingRefreshToken
            | GatewayError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Config(_)
            | GatewayError::HttpClient(_)
            | GatewayError::Io(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal detail stays in the logs.
        let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self, "internal gateway error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
