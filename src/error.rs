use crate::log::ErrorRecord;
use thiserror::Error;

/// Wrapper around `std::Result`
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed xml, undecodable bytes, or a file that could not be read.
    /// The record carries the position the parser stopped at.
    #[error("Parse error: {0}")]
    Parse(ErrorRecord),
    /// The path query could not be tokenized, parsed or evaluated.
    #[error("Invalid query `{query}`: {reason}")]
    InvalidQuery { query: String, reason: String },
    /// The root element (and the document node above it) has no parent to be
    /// detached from.
    #[error("Root element cannot be removed")]
    RootCannotMove,
    /// Call `element.detach()` before assigning another parent.
    #[error("Element already has a parent. Call detach() before changing parent.")]
    HasAParent,
    /// Element was not found among its parent's children.
    #[error("Element not found")]
    NotFound,
    /// Writing xml out failed.
    #[error("IO Error: {0}")]
    Io(String),
    /// Element and attribute names must not be empty.
    #[error("Invalid name: `{0}`")]
    InvalidName(String),
}

impl Error {
    pub(crate) fn invalid_query<Q: Into<String>, R: Into<String>>(query: Q, reason: R) -> Error {
        Error::InvalidQuery {
            query: query.into(),
            reason: reason.into(),
        }
    }

    /// Returns the parse record if this is a [`Error::Parse`].
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            Error::Parse(record) => Some(record),
            _ => None,
        }
    }
}

impl From<ErrorRecord> for Error {
    fn from(record: ErrorRecord) -> Error {
        Error::Parse(record)
    }
}
