//! Error types for the request pipeline.
//!
//! # Design
//! One variant per failure stage so callers can branch on where a call
//! stopped: the local auth guard (`Unauthenticated`), the transport
//! (`Transport`), the HTTP status line (`SessionExpired`, `Http`), envelope
//! decoding (`MalformedResponse`) and the backend's own verdict (`Business`).
//! `InvalidRequest` covers descriptors that cannot be encoded; like
//! `Unauthenticated` it never reaches the network.

use std::fmt;

use thiserror::Error;

/// Errors returned by `RequestClient`.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The call requires auth and no session token is stored.
    #[error("authentication required but no session is stored")]
    Unauthenticated,

    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered 401. The session has already been cleared.
    #[error("session expired")]
    SessionExpired,

    /// The server returned a non-2xx status other than 401.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A 2xx body that is not a valid envelope, or whose `data` does not match
    /// the requested type.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The envelope reported a logical failure.
    #[error("{message}")]
    Business { code: Option<i64>, message: String },

    /// The descriptor could not be turned into an HTTP request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RequestError {
    /// True for the two variants that send the user back to the login entry.
    pub fn requires_login(&self) -> bool {
        matches!(self, RequestError::Unauthenticated | RequestError::SessionExpired)
    }
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The round-trip exceeded the request timeout.
    Timeout,
    /// DNS resolution or the TCP/TLS connect failed.
    Connect,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => f.write_str("timed out"),
            TransportErrorKind::Connect => f.write_str("connection failed"),
            TransportErrorKind::Other => f.write_str("transport failure"),
        }
    }
}

/// A request that produced no HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }
}
