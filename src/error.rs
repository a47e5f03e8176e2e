//! Error types for the SiOt protocol.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for SiOt operations.
pub type Result<T> = std::result::Result<T, SiotError>;

/// Errors that can occur while talking to a SiOt device.
///
/// Every kind is distinct so the caller can choose between reconnecting
/// (`Connect`, `Closed`, `Io`, `Timeout`, `EchoMismatch`, `Desynchronized`)
/// or aborting (`InvalidDigit`, `InvalidResponse`, `AckMismatch`).
///
/// Responses carry no correlation id. Once a reply has been left unread or
/// misread, the stream cannot be trusted and every later query on the same
/// client fails with `Desynchronized`; retry on a new client.
#[derive(Debug, Error)]
pub enum SiotError {
    /// TCP connect to the device failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Device endpoint that was dialed.
        addr: SocketAddr,
        /// Underlying socket error.
        source: io::Error,
    },

    /// A character outside the expected hex or bit alphabet was decoded.
    #[error("invalid digit {digit:?} at position {position}")]
    InvalidDigit {
        /// The offending character.
        digit: char,
        /// Zero-based character position in the decoded string.
        position: usize,
    },

    /// The receive deadline expired before a full frame arrived.
    #[error("timed out waiting for {expected} bytes, received {received}")]
    Timeout {
        /// Frame length the command expects.
        expected: usize,
        /// Bytes accumulated before the deadline.
        received: usize,
    },

    /// The device closed the connection before a full frame arrived.
    #[error("connection closed after {received} of {expected} bytes")]
    Closed {
        /// Frame length the command expects.
        expected: usize,
        /// Bytes accumulated before the peer closed.
        received: usize,
    },

    /// The response header did not echo the op code that was sent.
    #[error("response echo mismatch: expected {expected:?}, received {received:?}")]
    EchoMismatch {
        /// Header the query expects.
        expected: String,
        /// Header that arrived.
        received: String,
    },

    /// An earlier query left the stream misaligned; the client must be
    /// replaced.
    #[error("connection out of sync after an earlier failure, reconnect required")]
    Desynchronized,

    /// A write acknowledgment did not echo the command header.
    #[error("acknowledgment mismatch: expected {expected:?}, received {received:?}")]
    AckMismatch {
        /// Expected acknowledgment prefix.
        expected: String,
        /// Raw acknowledgment received.
        received: String,
    },

    /// Invalid response received from the device.
    #[error("Invalid response: {reason}")]
    InvalidResponse {
        /// Description of the response error.
        reason: String,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SiotError {
    /// Creates a new `InvalidDigit` error.
    ///
    /// # Example
    ///
    /// ```
    /// use siot::SiotError;
    ///
    /// let err = SiotError::invalid_digit('G', 0);
    /// assert_eq!(err.to_string(), "invalid digit 'G' at position 0");
    /// ```
    pub fn invalid_digit(digit: char, position: usize) -> Self {
        Self::InvalidDigit { digit, position }
    }

    /// Creates a new `InvalidResponse` error.
    ///
    /// # Example
    ///
    /// ```
    /// use siot::SiotError;
    ///
    /// let err = SiotError::invalid_response("frame too short");
    /// ```
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use siot::SiotError;
    ///
    /// let err = SiotError::invalid_parameter("page", "must be 0-2");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `AckMismatch` error.
    pub fn ack_mismatch(expected: impl Into<String>, received: impl Into<String>) -> Self {
        Self::AckMismatch {
            expected: expected.into(),
            received: received.into(),
        }
    }

    /// Returns `true` if the error is a receive deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Creates a new `EchoMismatch` error.
    pub fn echo_mismatch(expected: impl Into<String>, received: impl Into<String>) -> Self {
        Self::EchoMismatch {
            expected: expected.into(),
            received: received.into(),
        }
    }

    /// Returns `true` if the connection can no longer be used and should be
    /// re-established by the caller.
    ///
    /// A timed-out reply may still arrive later, so `Timeout` counts as lost.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::Closed { .. }
                | Self::Io(_)
                | Self::Timeout { .. }
                | Self::EchoMismatch { .. }
                | Self::Desynchronized
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_digit_display() {
        let err = SiotError::invalid_digit('2', 5);
        assert_eq!(err.to_string(), "invalid digit '2' at position 5");
    }

    #[test]
    fn test_timeout_display() {
        let err = SiotError::Timeout {
            expected: 14,
            received: 4,
        };
        assert_eq!(err.to_string(), "timed out waiting for 14 bytes, received 4");
        assert!(err.is_timeout());
        assert!(err.is_connection_lost());
    }

    #[test]
    fn test_closed_is_connection_lost() {
        let err = SiotError::Closed {
            expected: 8,
            received: 0,
        };
        assert!(err.is_connection_lost());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_connect_display() {
        let err = SiotError::Connect {
            addr: "127.0.0.1:502".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.to_string(), "failed to connect to 127.0.0.1:502: refused");
        assert!(err.is_connection_lost());
    }

    #[test]
    fn test_echo_mismatch_is_connection_lost() {
        let err = SiotError::echo_mismatch("@R05", "@R10");
        assert_eq!(
            err.to_string(),
            "response echo mismatch: expected \"@R05\", received \"@R10\""
        );
        assert!(err.is_connection_lost());
        assert!(SiotError::Desynchronized.is_connection_lost());
    }

    #[test]
    fn test_ack_mismatch_display() {
        let err = SiotError::ack_mismatch("@W02", "@E01xx");
        assert_eq!(
            err.to_string(),
            "acknowledgment mismatch: expected \"@W02\", received \"@E01xx\""
        );
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = SiotError::invalid_parameter("page", "must be 0-2");
        assert_eq!(err.to_string(), "Invalid parameter 'page': must be 0-2");
    }
}
