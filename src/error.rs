//! Error type for the store's internal plumbing.
//!
//! The CRUD operations on [`ProductStore`](crate::ProductStore) never hand
//! these to callers; they surface only from [`flush`](crate::ProductStore::flush)
//! and from custom [`Persistence`](crate::persist::Persistence) implementations.

/// Things that can go wrong while loading or saving the record set.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// File system problem (read, write, rename).
    Io(String),
    /// Failed to encode the record set.
    Serialize(String),
    /// Failed to decode the backing contents.
    Deserialize(String),
    /// The backing contents parsed, but the top level is not an object.
    UnexpectedShape(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "i/o error: {msg}"),
            Error::Serialize(msg) => write!(f, "serialization error: {msg}"),
            Error::Deserialize(msg) => write!(f, "deserialization error: {msg}"),
            Error::UnexpectedShape(found) => {
                write!(f, "expected a top-level object of records, found {found}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.to_string())
        } else if err.is_syntax() || err.is_eof() || err.is_data() {
            Error::Deserialize(err.to_string())
        } else {
            Error::Serialize(err.to_string())
        }
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
