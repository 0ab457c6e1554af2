use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Unauthorized - token may be expired")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Unexpected status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

impl TransportError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => TransportError::Unauthorized(truncated),
            403 => TransportError::AccessDenied(truncated),
            404 => TransportError::NotFound(truncated),
            429 => TransportError::RateLimited,
            500..=599 => TransportError::ServerError(truncated),
            _ => TransportError::Status {
                status,
                body: truncated,
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Unauthorized(_))
    }

    /// HTTP status carried by the error, if a response was received.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        use reqwest::StatusCode;
        match self {
            TransportError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            TransportError::AccessDenied(_) => Some(StatusCode::FORBIDDEN),
            TransportError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            TransportError::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS),
            TransportError::ServerError(_) => None,
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Network(e) => e.status(),
            TransportError::InvalidResponse(_) | TransportError::InvalidRequest(_) => None,
        }
    }

    /// The `message` field of a JSON error body, when the service sent one.
    pub fn server_message(&self) -> Option<String> {
        let body = match self {
            TransportError::Unauthorized(body)
            | TransportError::AccessDenied(body)
            | TransportError::NotFound(body)
            | TransportError::ServerError(body)
            | TransportError::Status { body, .. } => body,
            _ => return None,
        };
        serde_json::from_str::<MessageBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
    }
}
