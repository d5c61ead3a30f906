//! Unified error type for the client core.
//!
//! Every backend call resolves to a [`ClientError`]. Views never match on
//! transport details; they ask [`ClientError::classify`] or
//! [`ClientError::user_message`] for something they can show.

use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Errors surfaced by the storefront client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request was sent but no response came back (connection refused,
    /// DNS failure, reset).
    #[error("backend unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The backend answered with a non-2xx status other than 401/403.
    #[error("server error {status}: {}", truncate(body))]
    Server { status: u16, body: String },

    /// The backend rejected the credentials (401/403). The gateway has
    /// already cleared the token store by the time this is returned.
    #[error("authorization failed ({status})")]
    Unauthorized { status: u16, body: String },

    /// Input rejected client-side before any request was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// A 2xx response carried a body we could not decode.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The hosted checkout endpoint refused to create a session.
    #[error("checkout failed: {0}")]
    Checkout(String),

    /// Hosted checkout was requested but is not configured.
    #[error("checkout is not configured")]
    CheckoutDisabled,

    /// Durable client storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The client could not be configured.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Any other HTTP client failure (request building, TLS setup).
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// A request path could not be joined onto the base URL.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Coarse failure classes used to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request exceeded the timeout.
    Timeout,
    /// The backend responded; carries the HTTP status.
    Response(u16),
    /// The request was sent but nothing came back.
    NoResponse,
    /// Anything else.
    Other,
}

impl ClientError {
    /// Map a `reqwest` transport error onto the client taxonomy.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() {
            Self::Unreachable(err)
        } else {
            Self::Http(err)
        }
    }

    /// Classify the failure: timeout first, then response presence, then
    /// request-sent-without-response, else other.
    #[must_use]
    pub const fn classify(&self) -> ErrorClass {
        match self {
            Self::Timeout => ErrorClass::Timeout,
            Self::Server { status, .. } | Self::Unauthorized { status, .. } => {
                ErrorClass::Response(*status)
            }
            Self::Unreachable(_) => ErrorClass::NoResponse,
            _ => ErrorClass::Other,
        }
    }

    /// Human-readable message for a transient notification.
    ///
    /// `fallback` is used when the failure is neither a timeout, a server
    /// response, nor an unreachable backend.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self.classify() {
            ErrorClass::Timeout => "Request timed out. Please try again.".to_string(),
            ErrorClass::Response(status) => {
                format!("Server error: {status}. Please try again later.")
            }
            ErrorClass::NoResponse => {
                "Unable to reach the server. Please check if the server is running.".to_string()
            }
            ErrorClass::Other => fallback.to_string(),
        }
    }

    /// HTTP status of the backend response, if there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Unauthorized { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend confirmed the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Server { status: 404, .. })
    }

    /// Whether this failure was already handled globally by the gateway.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Parsed JSON body of a backend error response.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        match self {
            Self::Server { body, .. } | Self::Unauthorized { body, .. } => {
                serde_json::from_str(body).ok()
            }
            _ => None,
        }
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_order() {
        assert_eq!(ClientError::Timeout.classify(), ErrorClass::Timeout);
        assert_eq!(
            ClientError::Server {
                status: 500,
                body: String::new()
            }
            .classify(),
            ErrorClass::Response(500)
        );
        assert_eq!(ClientError::Cancelled.classify(), ErrorClass::Other);
        assert_eq!(
            ClientError::Validation("quantity".into()).classify(),
            ErrorClass::Other
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ClientError::Timeout.user_message("fallback"),
            "Request timed out. Please try again."
        );
        assert_eq!(
            ClientError::Server {
                status: 502,
                body: "bad gateway".into()
            }
            .user_message("fallback"),
            "Server error: 502. Please try again later."
        );
        assert_eq!(
            ClientError::Decode("eof".into()).user_message("fallback"),
            "fallback"
        );
    }

    #[test]
    fn test_not_found_and_json_body() {
        let err = ClientError::Server {
            status: 404,
            body: r#"{"detail":"Not found."}"#.into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.json_body().and_then(|v| v["detail"].as_str().map(String::from)),
            Some("Not found.".to_string())
        );

        let plain = ClientError::Server {
            status: 500,
            body: "<html>".into(),
        };
        assert!(!plain.is_not_found());
        assert!(plain.json_body().is_none());
    }

    #[test]
    fn test_display_truncates_body() {
        let err = ClientError::Server {
            status: 500,
            body: "x".repeat(1000),
        };
        assert!(err.to_string().len() < 260);
    }
}
