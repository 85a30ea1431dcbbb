//! Frame layer: CRC-protected plaintext frames and the encrypted envelope
//!
//! Pairing frames are `command(u16) || payload || crc16`, all little-endian.
//! Encrypted frames wrap such a frame, prefixed by the authorization id, in a
//! secretbox with a clear header carrying nonce, authorization id and length.

mod assembler;
mod codec;
mod crc;
#[cfg(test)]
mod tests;

pub use self::assembler::{
    EncryptedFrameAssembler, Incoming, PairingFrameAssembler, pairing_frame_len,
};
pub use self::codec::{
    DecryptedFrame, EncryptedFrame, Frame, crc_valid, encode_encrypted_frame,
    encode_encrypted_frame_with_nonce, encode_frame,
};
pub use self::crc::crc16_ccitt;

use super::constants::CommandId;
use super::crypto::CryptoError;
use super::error::ProtocolError;

/// Frame decoding errors
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("CRC mismatch: frame carries {expected:#06x}, computed {actual:#06x}")]
    Checksum { expected: u16, actual: u16 },

    #[error("declared length {declared} but {actual} bytes follow")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("received {actual} bytes for a {expected} byte frame")]
    Overlong { expected: usize, actual: usize },

    #[error("ciphertext of {size} bytes exceeds limit of {max}")]
    TooLarge { size: usize, max: usize },

    #[error("no frame layout known for {0}")]
    UnknownCommand(CommandId),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl FrameError {
    /// Convert into a session error, tagging it with the session state
    #[must_use]
    pub fn into_protocol(self, state: &str) -> ProtocolError {
        match self {
            Self::Checksum { .. } => ProtocolError::Checksum {
                state: state.to_string(),
            },
            Self::UnknownCommand(command) => ProtocolError::UnexpectedCommand {
                state: state.to_string(),
                command,
            },
            Self::TooLarge { size, max } => ProtocolError::FrameTooLarge { size, max },
            Self::Crypto(CryptoError::DecryptionFailed(reason)) => {
                ProtocolError::AuthenticationFailed {
                    reason: format!("encrypted frame rejected: {reason}"),
                }
            }
            Self::Crypto(e) => ProtocolError::Crypto(e),
            other @ (Self::TooShort { .. } | Self::LengthMismatch { .. } | Self::Overlong { .. }) => {
                ProtocolError::MalformedFrame {
                    reason: other.to_string(),
                }
            }
        }
    }
}
