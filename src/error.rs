use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{upstream} unreachable: {source}")]
    Transport {
        upstream: &'static str,
        source: reqwest::Error,
    },
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error("invalid response from {upstream}: {reason}")]
    InvalidResponse {
        upstream: &'static str,
        reason: String,
    },
    #[error("invalid header value for {name}")]
    InvalidHeader { name: String },
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
}

impl GatewayError {
    /// Status reported when the error reaches the boundary unhandled.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Transport { .. }
            | GatewayError::Client(_)
            | GatewayError::InvalidResponse { .. }
            | GatewayError::InvalidHeader { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
