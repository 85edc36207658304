//! Error types for the transport layer.

use crate::subscription::ConnectionState;

/// Transport-layer errors.
///
/// Errors are `Clone` so a single fatal connection error can be fanned out
/// to every active subscription.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A document failed to lex or parse.
    #[error("parse error in {file}: {message}")]
    Parse {
        /// The file or source label the document came from.
        file: String,
        /// The underlying lex/syntax error, rendered with its location.
        message: String,
    },
    /// A document parsed but did not contain what the loader requires
    /// (no operations, no fragments, or clashing operation names).
    #[error("invalid document {file}: {message}")]
    LoadValidation {
        /// The file or source label the document came from.
        file: String,
        /// What was missing or duplicated.
        message: String,
    },
    /// Reading a document file failed.
    #[error("I/O error: {0}")]
    Io(String),
    /// HTTP request failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// Connection refused or failed, or the server reported a fatal
    /// connection-level error.
    #[error("connection error: {0}")]
    Connection(String),
    /// The operation timed out.
    #[error("timed out")]
    Timeout,
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
    /// Invalid URL provided.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Invalid header name or value.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The server sent a frame that breaks the negotiated subprotocol.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The connection closed while the operation or subscription was
    /// still live.
    #[error("connection closed")]
    ConnectionClosed,
    /// The operation requires a connection state the client is not in.
    #[error("connection not ready (state: {0})")]
    NotReady(ConnectionState),
    /// A subscription with this id is already active on the connection.
    #[error("subscription id already in use: {0}")]
    SubscriptionIdInUse(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// A specialized Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;
