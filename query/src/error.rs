//! Error types for neighbor queries.

use std::error::Error;
use std::fmt;

/// Errors that can occur during a single neighbor request.
///
/// Every variant is transient from the crawler's point of view, the request
/// may be retried against the same or another endpoint.
#[derive(Debug)]
pub enum QueryError {
    /// The HTTP request could not be sent or its body could not be read.
    Http(reqwest::Error),
    /// The peer answered with a non-success status code.
    Status(u16),
    /// No complete answer arrived within the per-request timeout.
    Timeout,
    /// The response body was not a neighbor listing.
    Decode(serde_json::Error),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Http(err) => write!(f, "HTTP request failed: {err}"),
            QueryError::Status(code) => write!(f, "Peer answered with status {code}"),
            QueryError::Timeout => write!(f, "Request timed out"),
            QueryError::Decode(err) => write!(f, "Malformed neighbor listing: {err}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            QueryError::Http(err) => Some(err),
            QueryError::Status(_) => None,
            QueryError::Timeout => None,
            QueryError::Decode(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        QueryError::Http(err)
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Decode(err)
    }
}
