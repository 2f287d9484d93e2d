//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

use crate::types::{EnhancedCode, ReplyCode};

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
///
/// Errors fall into two families. [`Error::Reply`] means the server answered
/// and refused. [`Error::NotSupported`] and [`Error::MessageTooLarge`] are
/// raised locally before any command is written; see [`Error::is_local`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Server returned a negative (or unexpected) reply.
    #[error(transparent)]
    Reply(#[from] ReplyError),

    /// Feature not advertised by the server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Declared message size exceeds the advertised `SIZE` limit.
    #[error("Message size {size} exceeds the allowable limit ({limit} bytes)")]
    MessageTooLarge {
        /// Declared message size in bytes.
        size: usize,
        /// Limit advertised by the server.
        limit: usize,
    },

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Reply line that does not follow the `DDD[- ]text` format.
    #[error("Malformed reply: {0}")]
    Malformed(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Returns true if this is a permanent server error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Reply(err) if err.code.is_permanent())
    }

    /// Returns true if this is a transient server error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Reply(err) if err.code.is_transient())
    }

    /// Returns true if the operation was refused locally, before anything
    /// was sent to the server.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::NotSupported(_) | Self::MessageTooLarge { .. })
    }

    /// Returns the server reply behind this error, if any.
    #[must_use]
    pub const fn reply(&self) -> Option<&ReplyError> {
        match self {
            Self::Reply(err) => Some(err),
            _ => None,
        }
    }
}

/// A negative server reply surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("SMTP error {code}: {message}")]
pub struct ReplyError {
    /// Text of every reply line joined with single spaces.
    pub message: String,
    /// Basic reply code of the final line.
    pub code: ReplyCode,
    /// Enhanced status code, when the server advertised `ENHANCEDSTATUSCODES`.
    pub enhanced_code: Option<EnhancedCode>,
}

impl ReplyError {
    /// Creates a reply error.
    #[must_use]
    pub fn new(
        code: ReplyCode,
        message: impl Into<String>,
        enhanced_code: Option<EnhancedCode>,
    ) -> Self {
        Self {
            message: message.into(),
            code,
            enhanced_code,
        }
    }

    /// Returns the joined reply text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reply_error(code: u16) -> Error {
        ReplyError::new(ReplyCode::new(code), "foo", None).into()
    }

    #[test]
    fn test_permanent_and_transient() {
        assert!(reply_error(550).is_permanent());
        assert!(!reply_error(550).is_transient());
        assert!(reply_error(451).is_transient());
        assert!(!reply_error(451).is_permanent());
    }

    #[test]
    fn test_local_errors() {
        assert!(Error::NotSupported("STARTTLS".into()).is_local());
        assert!(Error::MessageTooLarge { size: 100, limit: 10 }.is_local());
        assert!(!reply_error(550).is_local());
        assert!(!Error::Timeout(Duration::from_secs(1)).is_local());
    }

    #[test]
    fn test_reply_accessor() {
        let err = reply_error(500);
        assert_eq!(err.reply().unwrap().message(), "foo");
        assert!(Error::Malformed("x".into()).reply().is_none());
    }

    #[test]
    fn test_display() {
        let err = ReplyError::new(
            ReplyCode::new(550),
            "mailbox unavailable",
            EnhancedCode::parse("5.1.1"),
        );
        assert_eq!(err.to_string(), "SMTP error 550: mailbox unavailable");
        assert_eq!(
            Error::MessageTooLarge { size: 100, limit: 10 }.to_string(),
            "Message size 100 exceeds the allowable limit (10 bytes)"
        );
    }
}
