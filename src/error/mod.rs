//! Error types for trunkrs.

use std::io;

/// Errors raised by buffers, branches and entities.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// Buffered content would exceed the file-backed ceiling.
    ///
    /// Fatal: the byte that triggered it has already been consumed from the
    /// physical source, so retrying the read cannot recover the content.
    #[error("buffer overflow: content exceeds {limit} bytes")]
    Overflow {
        /// The configured file limit.
        limit: usize,
    },

    /// An operation was attempted on a closed branch.
    #[error("stream is closed")]
    ClosedStream,

    /// Content could not be decoded (unknown charset, bad text, bad JSON).
    #[error("decode error: {0}")]
    Decode(String),

    /// `pop()` was called with nothing pushed.
    #[error("pop without matching push")]
    IllegalPushPop,

    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// An I/O error from the physical source or a spill file.
    #[error("io error: {0}")]
    Io(io::Error),
}

/// Result alias for body operations.
pub type BodyResult<T> = Result<T, BodyError>;

impl BodyError {
    /// True for errors that make the underlying stream unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BodyError::Overflow { .. })
    }

    /// True for data-quality errors the caller may recover from.
    pub fn is_decode(&self) -> bool {
        matches!(self, BodyError::Decode(_))
    }

    /// Wraps this error so it can travel through [`std::io::Read`].
    ///
    /// [`From<io::Error>`] unwraps it again, so nothing is lost on the way.
    pub fn into_io(self) -> io::Error {
        match self {
            BodyError::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}

impl From<io::Error> for BodyError {
    fn from(e: io::Error) -> Self {
        match e.downcast::<BodyError>() {
            Ok(ours) => ours,
            Err(e) => BodyError::Io(e),
        }
    }
}

impl From<serde_json::Error> for BodyError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            return BodyError::Io(io::Error::from(e));
        }
        BodyError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: BodyError = io_err.into();
        assert!(matches!(err, BodyError::Io(_)));
    }

    #[test]
    fn test_round_trip_through_io() {
        let err = BodyError::Overflow { limit: 10 }.into_io();
        let back: BodyError = err.into();
        assert!(matches!(back, BodyError::Overflow { limit: 10 }));

        let back: BodyError = BodyError::ClosedStream.into_io().into();
        assert!(matches!(back, BodyError::ClosedStream));
    }

    #[test]
    fn test_display() {
        let err = BodyError::Overflow { limit: 1024 };
        assert!(err.to_string().contains("1024"));
        assert!(err.is_fatal());
        assert!(!BodyError::IllegalPushPop.is_fatal());
    }

    #[test]
    fn test_json_error_is_decode() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BodyError = json_err.into();
        assert!(err.is_decode());
    }
}
