//! Error types for notegraph.

use thiserror::Error;

/// Top-level result type for notegraph operations.
pub type Result<T> = std::result::Result<T, NotegraphError>;

/// Top-level error type for notegraph.
#[derive(Debug, Error)]
pub enum NotegraphError {
    /// An accessor was asked about a note the vault has never seen.
    #[error("note not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    /// A single file could not be read or decoded.
    #[error("failed to load {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl NotegraphError {
    /// Whether this error means "unknown note" rather than a failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_human_readable_messages() {
        let err = NotegraphError::NotFound("Ghost".to_string());
        assert_eq!(err.to_string(), "note not found: Ghost");

        let err = NotegraphError::Load {
            path: "notes/Broken.md".to_string(),
            reason: "stream did not contain valid UTF-8".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("notes/Broken.md"));
        assert!(msg.contains("UTF-8"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: NotegraphError = io.into();
        assert!(matches!(err, NotegraphError::Io(_)));
        assert!(!err.is_not_found());
    }
}
