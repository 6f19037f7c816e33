//! Error taxonomy for the retrieval client.
//!
//! Read paths recover from [`Error::Transport`] and [`Error::Shape`] locally
//! (shadow store fallback or best-effort defaults) and never surface them to
//! the caller. Write paths surface [`Error::Remote`] and [`Error::Transport`]
//! with a human-readable message. [`Error::Identity`] is always surfaced
//! immediately.
//!
//! Not-found is deliberately absent: zero results after every matching
//! strategy has been tried is a valid outcome, represented as an empty
//! collection, and must stay distinguishable from a transport failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The network was unreachable or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote service rejected the request with a non-2xx status.
    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// The payload parsed but did not carry the expected fields.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// A required credential (e.g. the owner id) was missing.
    #[error("missing identity: {0}")]
    Identity(String),

    /// A request parameter failed client-side validation before any I/O.
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
