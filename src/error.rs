use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Result returning Error
pub type Result<T> = std::result::Result<T, Error>;

/// Node codec errors. Invariant violations caused by a buggy caller are not represented here;
/// those panic. These are the errors a caller can observe and act on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// The page format parameters are unusable.
    Config(String),
    /// A persisted page does not follow the node layout.
    Corrupt(String),
    /// An unexpected failure outside the page format, such as a serialization error.
    Internal(String),
    /// A key or value was rejected before reaching a page.
    Value(String),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(s) => write!(f, "Invalid page configuration: {}", s),
            Error::Corrupt(s) => write!(f, "Corrupt page: {}", s),
            Error::Internal(s) | Error::Value(s) => write!(f, "{}", s),
        }
    }
}

impl From<Box<bincode::ErrorKind>> for Error {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        Error::Internal(err.to_string())
    }
}
