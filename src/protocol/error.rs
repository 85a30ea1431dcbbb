//! Errors raised by the sans-IO protocol sessions

use std::fmt;

use super::constants::{CommandId, error_codes};
use super::crypto::CryptoError;

/// Error reported by the lock in an ERROR frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceError {
    /// Decoded error code
    pub kind: DeviceErrorKind,
    /// Command the lock was processing
    pub command: CommandId,
}

impl DeviceError {
    /// Decode an ERROR frame payload: code (u8) followed by command id (u16 LE)
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let (&code, rest) = payload.split_first()?;
        Some(Self {
            kind: DeviceErrorKind::from(code),
            command: CommandId::from_prefix(rest).unwrap_or(CommandId(0)),
        })
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (while processing {})", self.kind, self.command)
    }
}

/// Lock error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    /// Public key requested while the lock is not in pairing mode
    NotPairing,
    /// Lock rejected our authenticator
    BadAuthenticator,
    /// Invalid pairing parameter
    PairingBadParameter,
    /// No free authorization slot
    MaxUser,
    /// Wrong security PIN
    BadPin,
    /// Challenge nonce mismatch
    BadNonce,
    /// Invalid command parameter
    BadParameter,
    /// Lock computed a different CRC
    BadCrc,
    /// Lock rejected the frame length
    BadLength,
    /// Unspecified failure
    Unknown,
    /// Code not known to this crate
    Other(u8),
}

impl From<u8> for DeviceErrorKind {
    fn from(code: u8) -> Self {
        match code {
            error_codes::P_ERROR_NOT_PAIRING => Self::NotPairing,
            error_codes::P_ERROR_BAD_AUTHENTICATOR => Self::BadAuthenticator,
            error_codes::P_ERROR_BAD_PARAMETER => Self::PairingBadParameter,
            error_codes::P_ERROR_MAX_USER => Self::MaxUser,
            error_codes::K_ERROR_BAD_PIN => Self::BadPin,
            error_codes::K_ERROR_BAD_NONCE => Self::BadNonce,
            error_codes::K_ERROR_BAD_PARAMETER => Self::BadParameter,
            error_codes::ERROR_BAD_CRC => Self::BadCrc,
            error_codes::ERROR_BAD_LENGTH => Self::BadLength,
            error_codes::ERROR_UNKNOWN => Self::Unknown,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPairing => f.write_str("not in pairing mode"),
            Self::BadAuthenticator => f.write_str("bad authenticator"),
            Self::PairingBadParameter => f.write_str("bad pairing parameter"),
            Self::MaxUser => f.write_str("maximum number of users reached"),
            Self::BadPin => f.write_str("bad PIN"),
            Self::BadNonce => f.write_str("bad nonce"),
            Self::BadParameter => f.write_str("bad parameter"),
            Self::BadCrc => f.write_str("bad CRC"),
            Self::BadLength => f.write_str("bad length"),
            Self::Unknown => f.write_str("unknown error"),
            Self::Other(code) => write!(f, "error code 0x{code:02x}"),
        }
    }
}

/// Protocol errors
///
/// Every variant is terminal for the session that raised it.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A complete frame arrived that the current state does not accept
    #[error("unexpected {command} in state {state}")]
    UnexpectedCommand {
        /// Session state when the frame arrived
        state: String,
        /// Command id of the frame
        command: CommandId,
    },

    /// Frame could not be parsed
    #[error("malformed frame: {reason}")]
    MalformedFrame {
        /// What was wrong with it
        reason: String,
    },

    /// Declared or accumulated frame length exceeds the configured limit
    #[error("frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Offending length
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Trailing CRC did not match the frame contents
    #[error("CRC mismatch in state {state}")]
    Checksum {
        /// Session state when the frame arrived
        state: String,
    },

    /// The lock failed to prove knowledge of the shared secret
    #[error("authentication failed: {reason}")]
    AuthenticationFailed {
        /// Which proof failed
        reason: String,
    },

    /// Decrypted frame carries a different authorization id than ours
    #[error("authorization id mismatch: expected {expected}, got {actual}")]
    AuthorizationMismatch {
        /// Our authorization id
        expected: u32,
        /// Id found in the frame
        actual: u32,
    },

    /// Lock answered with an ERROR frame
    #[error("lock reported {0}")]
    Device(DeviceError),

    /// Operation invoked in the wrong session state
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Required state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Cryptographic primitive failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ProtocolError {
    /// Whether this error indicates tampering or a wrong key
    #[must_use]
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::Crypto(CryptoError::DecryptionFailed(_))
        )
    }
}
