//! Error types for the Notflix API client.
//!
//! # Design
//! Every failure is a tagged `ApiError`. `NotFound` and `Unauthorized` get
//! dedicated variants because callers react to them differently from other
//! statuses; all other non-2xx responses land in `Http` with the raw status
//! code and body. UI layers that only want the generic notification text call
//! [`ApiError::user_message`].

use thiserror::Error;

/// Message shown to end users for any failed call.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something bad happened, please try again later.";

/// Errors raised by a `SessionStore` implementation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session storage is corrupt: {0}")]
    Corrupt(String),

    #[error("could not serialize session: {0}")]
    Serialize(String),

    #[error("session lock poisoned")]
    Poisoned,
}

/// Errors returned by `NotflixClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned 401; the token is missing, unknown or expired.
    #[error("unauthorized: {body}")]
    Unauthorized { body: String },

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The configured base URL cannot be used to build request URLs.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),

    /// Reading or writing the session store failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Fieldless discriminant of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    NotFound,
    Unauthorized,
    Http,
    Deserialization,
    Serialization,
    InvalidUrl,
    Session,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::NotFound => ErrorKind::NotFound,
            ApiError::Unauthorized { .. } => ErrorKind::Unauthorized,
            ApiError::Http { .. } => ErrorKind::Http,
            ApiError::Deserialization(_) => ErrorKind::Deserialization,
            ApiError::Serialization(_) => ErrorKind::Serialization,
            ApiError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            ApiError::Session(_) => ErrorKind::Session,
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The human-readable text a UI shows for this failure. Identical for
    /// every variant; the detail is only available through `Display`.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}
