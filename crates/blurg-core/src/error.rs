//! Error types for blurg-core

use thiserror::Error;

/// Result type alias using blurg-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in blurg-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Entry or diary not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reserved or malformed diary name
    #[error("Invalid diary name: {0}")]
    InvalidName(String),

    /// Remote diary key failed verification
    #[error("Diary key is invalid")]
    InvalidKey,

    /// Server answered with a non-ok result or an unreadable payload
    #[error("Remote error: {0}")]
    Remote(String),

    /// Server could not be reached (connection failure or timeout)
    #[error("Failed to connect to the server: {0}")]
    Unreachable(String),

    /// Name collision on create
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Registry state on disk cannot be read
    #[error("Config is corrupt: {0}")]
    ConfigCorrupt(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised while operating on a named diary
    #[error("Diary \"{name}\": {source}")]
    Diary {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

/// Coarse classification of an [`Error`], looking through diary context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidName,
    InvalidKey,
    Remote,
    AlreadyExists,
    ConfigCorrupt,
    InvalidInput,
    Io,
}

impl Error {
    /// Attach the diary name an error was raised for.
    ///
    /// Already-wrapped errors are returned unchanged.
    #[must_use]
    pub fn in_diary(self, name: &str) -> Self {
        match self {
            Self::Diary { .. } => self,
            other => Self::Diary {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidName(_) => ErrorKind::InvalidName,
            Self::InvalidKey => ErrorKind::InvalidKey,
            Self::Remote(_) | Self::Unreachable(_) => ErrorKind::Remote,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::ConfigCorrupt(_) => ErrorKind::ConfigCorrupt,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Io,
            Self::Diary { source, .. } => source.kind(),
        }
    }

    /// True when the server could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Diary { source, .. } => source.is_unreachable(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() || error.is_request() {
            Self::Unreachable(crate::util::compact_text(&error.to_string()))
        } else {
            Self::Remote(crate::util::compact_text(&error.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_looks_through_diary_context() {
        let error = Error::NotFound("entry 3".to_string()).in_diary("work");
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(error.to_string().contains("work"));
    }

    #[test]
    fn in_diary_does_not_double_wrap() {
        let error = Error::InvalidKey.in_diary("a").in_diary("b");
        assert!(error.to_string().starts_with("Diary \"a\""));
    }

    #[test]
    fn unreachable_is_a_remote_error() {
        let error = Error::Unreachable("refused".to_string()).in_diary("x");
        assert_eq!(error.kind(), ErrorKind::Remote);
        assert!(error.is_unreachable());
        assert!(!Error::Remote("bad".to_string()).is_unreachable());
    }
}
