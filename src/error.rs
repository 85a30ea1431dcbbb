use std::time::Duration;

use thiserror::Error;

use crate::protocol::{DeviceErrorKind, ProtocolError};
use crate::storage::StorageError;
use crate::transport::TransportError;

/// Errors that can occur while pairing with or commanding a lock
#[derive(Debug, Error)]
pub enum NukiError {
    /// Bluetooth backend failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Protocol violation, checksum or authentication failure, or a lock error
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No terminal frame before the deadline
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// What was running
        operation: &'static str,
        /// Deadline that elapsed
        duration: Duration,
    },

    /// Another command is still in flight on this connection
    #[error("command already in progress")]
    CommandInProgress,

    /// Discovery ended without a lock accepting the pairing
    #[error("no lock in pairing mode found")]
    NoPairableLock,

    /// Credential store failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid argument from the caller
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl NukiError {
    /// Check if retrying the whole operation may succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } | Self::CommandInProgress => true,
            Self::Protocol(ProtocolError::Device(e)) => matches!(
                e.kind,
                DeviceErrorKind::NotPairing | DeviceErrorKind::BadNonce | DeviceErrorKind::BadCrc
            ),
            _ => false,
        }
    }

    /// Check if this error may indicate a man-in-the-middle or a wrong key
    #[must_use]
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, Self::Protocol(e) if e.is_security_relevant())
    }
}

/// Result type alias for lock operations
pub type Result<T> = std::result::Result<T, NukiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::CommandId;
    use crate::protocol::{DeviceError, DeviceErrorKind};

    #[test]
    fn test_error_display() {
        let err = NukiError::Timeout {
            operation: "get_state",
            duration: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "get_state timed out after 30s");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(NukiError::CommandInProgress.is_recoverable());
        assert!(NukiError::from(TransportError::Disconnected).is_recoverable());

        let bad_pin = ProtocolError::Device(DeviceError {
            kind: DeviceErrorKind::BadPin,
            command: CommandId::LOCK_ACTION,
        });
        assert!(!NukiError::from(bad_pin).is_recoverable());
    }

    #[test]
    fn test_error_is_security_relevant() {
        let err = NukiError::from(ProtocolError::AuthenticationFailed {
            reason: "mismatch".to_string(),
        });
        assert!(err.is_security_relevant());
        assert!(!err.is_recoverable());

        let checksum = NukiError::from(ProtocolError::Checksum {
            state: "AwaitChallenge".to_string(),
        });
        assert!(!checksum.is_security_relevant());
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NukiError>();
    }
}
