use http::StatusCode;
use thiserror::Error;

/// Result type alias for publisher operations
pub type Result<T, E = PublishError> = std::result::Result<T, E>;

/// Errors that can occur while handling a publish request
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("unauthorized")]
    Unauthorized,

    #[error("server not configured")]
    NotConfigured,

    #[error("request body is empty")]
    EmptyBody,

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("upstream returned status {status}")]
    Upstream { status: u16, body: String },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// HTTP status reported to the caller. Upstream failures keep the
    /// upstream's own status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PublishError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            PublishError::Unauthorized => StatusCode::UNAUTHORIZED,
            PublishError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            PublishError::EmptyBody
            | PublishError::InvalidBody(_)
            | PublishError::RequestBody(_) => StatusCode::BAD_REQUEST,
            PublishError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            PublishError::Transport(_) | PublishError::Internal(_) | PublishError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Diagnostic payload attached to the error envelope, if any. Upstream
    /// response bodies are forwarded verbatim.
    pub fn details(&self) -> Option<String> {
        match self {
            PublishError::Upstream { body, .. } if !body.is_empty() => Some(body.clone()),
            _ => None,
        }
    }
}
