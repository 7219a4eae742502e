//! Error taxonomy and origin validation for the Streamable HTTP transport.

use std::fmt;

/// Error type for Streamable HTTP operations, convertible to an HTTP status
/// via the `From<StreamableError> for axum::http::StatusCode` impl in
/// [`crate::router`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamableError {
    SessionNotFound(String),
    SessionTerminated(String),
    InvalidMethod(String),
    InvalidOrigin(String),
    MissingOrigin,
    InvalidRequest(String),
    BodyTooLarge { size: usize, max: usize },
    TooManyStreams { count: usize, max: usize },
    InternalError(String),
}

impl fmt::Display for StreamableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Self::SessionTerminated(id) => write!(f, "session terminated: {id}"),
            Self::InvalidMethod(m) => write!(f, "invalid method: {m}"),
            Self::InvalidOrigin(o) => write!(f, "invalid origin: {o}"),
            Self::MissingOrigin => write!(f, "origin header required"),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Self::BodyTooLarge { size, max } => {
                write!(f, "request body too large: {size} bytes (max: {max})")
            }
            Self::TooManyStreams { count, max } => {
                write!(f, "too many concurrent streams: {count} (max: {max})")
            }
            Self::InternalError(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for StreamableError {}

/// Result of validating a request's `Origin` header against the configured
/// allow-list (spec §4.2 origin policy).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OriginValidation {
    Valid,
    Missing,
    Invalid(String),
}

impl OriginValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Whether the request should proceed: an allowed origin always passes;
    /// a missing one passes only when origin validation isn't required.
    pub fn passed(&self, require_origin: bool) -> bool {
        match self {
            Self::Valid => true,
            Self::Missing => !require_origin,
            Self::Invalid(_) => false,
        }
    }

    /// Validate an origin against a list of allowed patterns.
    ///
    /// A pattern ending in `*` glob-matches any origin sharing its
    /// prefix up to the `*` (e.g. `https://api.*` matches
    /// `https://api.example.com`). An empty `allowed` list permits every
    /// origin.
    pub fn validate(origin: Option<&str>, allowed: &[String]) -> Self {
        match origin {
            None => Self::Missing,
            Some(_) if allowed.is_empty() => Self::Valid,
            Some(o) if allowed.iter().any(|pattern| origin_matches(pattern, o)) => Self::Valid,
            Some(o) => Self::Invalid(o.to_string()),
        }
    }
}

fn origin_matches(pattern: &str, origin: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => origin.starts_with(prefix),
        None => pattern == origin,
    }
}
