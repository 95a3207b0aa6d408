//! The crate-wide error type.
//!
//! Mirrors the way the rest of the stack reports failures: a single enum,
//! one variant per failure category, constructed through small helper
//! functions instead of tuple-struct literals so call sites read like
//! sentences (`Error::illegal_argument("Runs must be > 0")`).

use std::fmt::{self, Display, Formatter};

/// Errors that can occur anywhere in the fuzzing core.
#[derive(Debug)]
pub enum Error {
    /// A caller-supplied argument was invalid (bad config, bad CLI value, ...).
    IllegalArgument(String),
    /// The system observed a state it should never be in (protocol desync,
    /// a result received without an outstanding request, ...).
    IllegalState(String),
    /// (De)serializing a wire message failed.
    Serialize(String),
    /// A filesystem operation failed.
    Io(String),
    /// A lookup (target name, dictionary slot, ...) came up empty.
    NotFound(String),
    /// A feature is intentionally unimplemented.
    NotImplemented(String),
}

impl Error {
    /// A caller-supplied argument was invalid.
    pub fn illegal_argument<S: Into<String>>(msg: S) -> Self {
        Error::IllegalArgument(msg.into())
    }

    /// An invariant was violated; this is a programming error.
    pub fn illegal_state<S: Into<String>>(msg: S) -> Self {
        Error::IllegalState(msg.into())
    }

    /// Wire (de)serialization failed.
    pub fn serialize<S: Into<String>>(msg: S) -> Self {
        Error::Serialize(msg.into())
    }

    /// A name lookup failed.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Error::NotFound(msg.into())
    }

    /// The requested behavior is not implemented.
    pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
        Error::NotImplemented(msg.into())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::IllegalArgument(s) => write!(f, "illegal argument: {s}"),
            Error::IllegalState(s) => write!(f, "illegal state: {s}"),
            Error::Serialize(s) => write!(f, "serialization error: {s}"),
            Error::Io(s) => write!(f, "I/O error: {s}"),
            Error::NotFound(s) => write!(f, "not found: {s}"),
            Error::NotImplemented(s) => write!(f, "not implemented: {s}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for Error {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        Error::Serialize(e.to_string())
    }
}
