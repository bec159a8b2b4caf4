use std::{sync::Arc, time::Duration};

use reqwest::StatusCode;
use thiserror::Error;

/// Result type used throughout the SDK.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by ad queries and client construction.
///
/// Event delivery never returns these to the caller; failures there are reported through the
/// completion callback and the debug sink instead.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration or arguments, or a 4xx response not covered by a more specific
    /// variant. Never retried.
    #[error("validation error: {message}")]
    Validation {
        /// Status code when the error comes from an HTTP response.
        status: Option<StatusCode>,
        /// Human-readable description. For HTTP errors, includes the response body.
        message: String,
    },

    /// Invalid `base_url` or `events_base_url` configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The server answered 401 Unauthorized.
    #[error("unauthorized, publisher credentials were rejected")]
    Authentication,

    /// The server answered 404 Not Found.
    #[error("resource not found: {url}")]
    NotFound {
        /// Requested URL.
        url: String,
    },

    /// The server answered 429 Too Many Requests. Not retried automatically.
    #[error("rate limit exceeded")]
    RateLimit {
        /// Parsed `Retry-After` header, if the server sent one.
        retry_after: Option<Duration>,
    },

    /// The server kept answering 5xx after all retries were used.
    #[error("server error: {status}")]
    Server {
        /// Status code of the last attempt.
        status: StatusCode,
    },

    /// A response status outside of the 2xx/4xx/5xx ranges.
    #[error("unexpected response status: {status}")]
    UnexpectedStatus {
        /// Received status code.
        status: StatusCode,
    },

    /// Transport failure (timeout, DNS, connection reset) after all retries were used.
    #[error(transparent)]
    // reqwest::Error is not clonable, so we're wrapping it in an Arc.
    Network(Arc<reqwest::Error>),

    /// The response body could not be decoded into ads.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An I/O error, e.g. failing to start the event delivery runtime.
    #[error(transparent)]
    Io(Arc<std::io::Error>),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Error {
        Error::Validation {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if it originated from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Validation { status, .. } => *status,
            Error::Authentication => Some(StatusCode::UNAUTHORIZED),
            Error::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Error::RateLimit { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            Error::Server { status } | Error::UnexpectedStatus { status } => Some(*status),
            _ => None,
        }
    }

    /// Whether the request executor re-issues a request that failed with this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Server { .. } | Error::Network(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value))
    }
}

/// Reasons an ads response body fails to decode.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum DecodeError {
    /// The body is not valid JSON.
    #[error("malformed response body")]
    Json(#[source] Arc<serde_json::Error>),

    /// The body (or an ad record) is valid JSON but not an object.
    #[error("expected a JSON object")]
    NotAnObject,

    /// The `type` discriminator names an ad variant this SDK does not know.
    #[error("unknown ad type: {ad_type}")]
    UnknownAdType {
        /// Value of the `type` field.
        ad_type: String,
    },

    /// A required field is absent, null, or blank.
    #[error("missing required field: {field}")]
    MissingField {
        /// Wire name of the field.
        field: String,
    },

    /// A field is present but has the wrong JSON type.
    #[error("invalid field {field}: expected {expected}")]
    InvalidField {
        /// Wire name of the field.
        field: String,
        /// Expected JSON type.
        expected: &'static str,
    },
}

impl From<serde_json::Error> for DecodeError {
    fn from(value: serde_json::Error) -> Self {
        DecodeError::Json(Arc::new(value))
    }
}

impl DecodeError {
    pub(crate) fn missing(field: impl Into<String>) -> DecodeError {
        DecodeError::MissingField {
            field: field.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{DecodeError, Error};

    #[test]
    fn only_server_and_network_errors_are_retryable() {
        assert!(Error::Server {
            status: StatusCode::BAD_GATEWAY
        }
        .is_retryable());
        assert!(!Error::Authentication.is_retryable());
        assert!(!Error::RateLimit { retry_after: None }.is_retryable());
        assert!(!Error::validation("bad").is_retryable());
        assert!(!Error::from(DecodeError::NotAnObject).is_retryable());
    }

    #[test]
    fn status_reflects_http_origin() {
        assert_eq!(Error::Authentication.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(
            Error::NotFound { url: "x".into() }.status(),
            Some(StatusCode::NOT_FOUND)
        );
        assert_eq!(Error::validation("blank session").status(), None);
    }
}
