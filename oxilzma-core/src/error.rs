//! Error types for OxiLZMA operations.
//!
//! Only conditions a caller can act on are errors. Running out of dictionary
//! space is reported as a status next to a byte count (see
//! [`SpaceStatus`](crate::ringbuffer::SpaceStatus)), and violated internal
//! invariants panic.

use std::io;
use thiserror::Error;

/// The main error type for OxiLZMA operations.
#[derive(Debug, Error)]
pub enum LzmaError {
    /// I/O error from the underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The output sink has reached its byte limit.
    #[error("output limit reached")]
    Limit,

    /// Invalid encoder configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the offending setting.
        message: String,
    },

    /// Unknown or unsupported match finder code.
    #[error("Unsupported match finder: {name}")]
    UnsupportedMatchFinder {
        /// The code that was requested.
        name: String,
    },

    /// Data was written to an encoder that has already been closed.
    #[error("encoder already closed")]
    Closed,

    /// Corrupted compressed data.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Uncompressed offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid stream start.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },
}

/// Result type alias for OxiLZMA operations.
pub type Result<T> = std::result::Result<T, LzmaError>;

impl LzmaError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unsupported match finder error.
    pub fn unsupported_match_finder(name: impl Into<String>) -> Self {
        Self::UnsupportedMatchFinder { name: name.into() }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Returns true if this is the recoverable output limit condition.
    pub fn is_limit(&self) -> bool {
        matches!(self, Self::Limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LzmaError::invalid_config("lc + lp must not exceed 4");
        assert!(err.to_string().contains("lc + lp"));

        let err = LzmaError::unsupported_match_finder("bt4");
        assert!(err.to_string().contains("bt4"));

        let err = LzmaError::corrupted(17, "distance beyond history");
        assert!(err.to_string().contains("17"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: LzmaError = io_err.into();
        assert!(matches!(err, LzmaError::Io(_)));
        assert!(!err.is_limit());
        assert!(LzmaError::Limit.is_limit());
    }
}
