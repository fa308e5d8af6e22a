//! Error types for the GraphQL transport.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used when neither the transport nor the server supplied one.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// How a [`GraphqlError`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response was received (DNS, connect, timeout).
    Network,
    /// The response body could not be read or decoded as JSON.
    InvalidBody,
    /// The response status was outside the 2xx range.
    HttpStatus,
    /// The server answered with a non-empty `errors` list.
    Graphql,
    /// The `data` payload did not match the operation's data type.
    Decode,
    /// The variables could not be serialized to JSON.
    InvalidVariables,
}

/// Classified failure of a single GraphQL exchange.
///
/// Carries the operation name and the printed query so callers can report or
/// retry without going back to the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GraphqlError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    operation_name: Option<String>,
    query: Option<String>,
}

impl GraphqlError {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            message: if message.is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                message
            },
            status: None,
            operation_name: None,
            query: None,
        }
    }

    /// Failure carrying the status text of the exchange as its message.
    ///
    /// `reason` is the phrase the server sent on the status line; without one
    /// the registered phrase for `status` is used.
    pub(crate) fn from_status(
        kind: ErrorKind,
        status: StatusCode,
        reason: Option<&str>,
    ) -> Self {
        let message = reason
            .filter(|reason| !reason.is_empty())
            .or_else(|| status.canonical_reason())
            .unwrap_or(UNKNOWN_ERROR);
        Self::new(kind, message).with_status(status)
    }

    pub(crate) fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status.as_u16());
        self
    }

    pub(crate) fn with_operation(
        mut self,
        operation_name: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        self.operation_name = Some(operation_name.into());
        self.query = Some(query.into());
        self
    }

    /// How the failure was triggered.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message (status text or the first GraphQL error).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the exchange, when a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Operation name sent on the wire (empty for anonymous operations).
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Printed query text sent on the wire.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns `true` if a caller-side retry could plausibly succeed.
    ///
    /// This is classification only; the transport itself never retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::Network => true,
            ErrorKind::HttpStatus | ErrorKind::InvalidBody => self
                .status
                .and_then(|status| StatusCode::from_u16(status).ok())
                .is_some_and(|status| {
                    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
                }),
            ErrorKind::Graphql | ErrorKind::Decode | ErrorKind::InvalidVariables => false,
        }
    }
}

/// Result alias for transport and adapter operations.
pub type GraphqlResult<T> = Result<T, GraphqlError>;

/// Error constructing an [`OperationDocument`](crate::OperationDocument).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The source text is not valid GraphQL syntax.
    #[error("GraphQL syntax error: {0}")]
    Syntax(String),

    /// The document declares no operation.
    #[error("document contains no operation definition")]
    NoOperation,

    /// The document declares more than one operation.
    #[error("document contains {count} operation definitions, expected one")]
    MultipleOperations {
        /// Number of operation definitions found.
        count: usize,
    },
}

/// Error building a [`Transport`](crate::Transport) from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configured header name is not a valid HTTP header name.
    #[error("invalid header name: {0}")]
    HeaderName(String),

    /// A configured header value is not a valid HTTP header value.
    #[error("invalid value for header {0}")]
    HeaderValue(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// The configuration could not be deserialized.
    #[error("configuration error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_becomes_message() {
        let err = GraphqlError::from_status(ErrorKind::HttpStatus, StatusCode::BAD_GATEWAY, None);
        assert_eq!(err.message(), "Bad Gateway");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "Bad Gateway");
    }

    #[test]
    fn server_reason_phrase_wins() {
        let err = GraphqlError::from_status(
            ErrorKind::HttpStatus,
            StatusCode::INTERNAL_SERVER_ERROR,
            Some("Database Down"),
        );
        assert_eq!(err.message(), "Database Down");
        assert_eq!(err.status(), Some(500));

        let blank =
            GraphqlError::from_status(ErrorKind::HttpStatus, StatusCode::NOT_FOUND, Some(""));
        assert_eq!(blank.message(), "Not Found");
    }

    #[test]
    fn empty_message_falls_back() {
        let err = GraphqlError::new(ErrorKind::Graphql, "");
        assert_eq!(err.message(), UNKNOWN_ERROR);
    }

    #[test]
    fn unregistered_status_has_no_reason() {
        let status = StatusCode::from_u16(599).expect("valid status");
        let err = GraphqlError::from_status(ErrorKind::HttpStatus, status, None);
        assert_eq!(err.message(), UNKNOWN_ERROR);
        assert_eq!(err.status(), Some(599));
    }

    #[test]
    fn operation_context_is_attached() {
        let err = GraphqlError::new(ErrorKind::Graphql, "boom")
            .with_status(StatusCode::OK)
            .with_operation("Viewer", "query Viewer { viewer { id } }");
        assert_eq!(err.operation_name(), Some("Viewer"));
        assert_eq!(err.query(), Some("query Viewer { viewer { id } }"));
        assert_eq!(err.kind(), ErrorKind::Graphql);
    }

    #[test]
    fn retryable_classification() {
        let network = GraphqlError::new(ErrorKind::Network, "connection refused");
        assert!(network.is_retryable());

        let server = GraphqlError::from_status(
            ErrorKind::HttpStatus,
            StatusCode::SERVICE_UNAVAILABLE,
            None,
        );
        assert!(server.is_retryable());

        let throttled = GraphqlError::from_status(
            ErrorKind::HttpStatus,
            StatusCode::TOO_MANY_REQUESTS,
            None,
        );
        assert!(throttled.is_retryable());

        let not_found =
            GraphqlError::from_status(ErrorKind::HttpStatus, StatusCode::NOT_FOUND, None);
        assert!(!not_found.is_retryable());

        let app = GraphqlError::new(ErrorKind::Graphql, "Not Found").with_status(StatusCode::OK);
        assert!(!app.is_retryable());
    }
}
