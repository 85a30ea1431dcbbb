//! Plain and encrypted frame encoding

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use bytes::Bytes;
use rand::{CryptoRng, RngCore};

use super::FrameError;
use super::crc::crc16_ccitt;
use crate::protocol::constants::{CommandId, sizes};
use crate::protocol::crypto::{CryptoError, SecretBox};

/// Encode `command || payload || crc16`
#[must_use]
pub fn encode_frame(command: CommandId, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(sizes::COMMAND_ID + payload.len() + sizes::CRC);
    frame.extend_from_slice(&command.to_le_bytes());
    frame.extend_from_slice(payload);
    append_crc(&mut frame);
    frame
}

/// Check the trailing little-endian CRC of `frame`
#[must_use]
pub fn crc_valid(frame: &[u8]) -> bool {
    split_crc(frame).is_ok()
}

fn append_crc(buf: &mut Vec<u8>) {
    let crc = crc16_ccitt(buf);
    buf.extend_from_slice(&crc.to_le_bytes());
}

/// Split off and verify the trailing CRC, returning the covered bytes
fn split_crc(frame: &[u8]) -> Result<&[u8], FrameError> {
    if frame.len() < sizes::CRC {
        return Err(FrameError::TooShort {
            len: frame.len(),
            min: sizes::CRC,
        });
    }
    let (body, trailer) = frame.split_at(frame.len() - sizes::CRC);
    let expected = LittleEndian::read_u16(trailer);
    let actual = crc16_ccitt(body);
    if expected != actual {
        return Err(FrameError::Checksum { expected, actual });
    }
    Ok(body)
}

/// A CRC-validated plaintext frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command id
    pub command: CommandId,
    /// Bytes between the command id and the CRC
    pub payload: Bytes,
}

impl Frame {
    /// Validate the CRC of a complete frame and split it into command and payload
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is shorter than a command id plus CRC or
    /// the CRC does not match.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let min = sizes::COMMAND_ID + sizes::CRC;
        if bytes.len() < min {
            return Err(FrameError::TooShort {
                len: bytes.len(),
                min,
            });
        }
        let body = split_crc(bytes)?;
        let (command, payload) = body.split_at(sizes::COMMAND_ID);
        Ok(Self {
            command: CommandId(LittleEndian::read_u16(command)),
            payload: Bytes::copy_from_slice(payload),
        })
    }

    /// Re-encode this frame with a fresh CRC
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(self.command, &self.payload)
    }
}

/// Encode an encrypted command frame under a fresh random nonce
///
/// # Errors
///
/// Returns an error if encryption fails.
pub fn encode_encrypted_frame<R: RngCore + CryptoRng>(
    secretbox: &SecretBox,
    authorization_id: u32,
    command: CommandId,
    payload: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let mut nonce = [0u8; sizes::COMMAND_NONCE];
    rng.try_fill_bytes(&mut nonce)
        .map_err(|_| CryptoError::RngError)?;
    encode_encrypted_frame_with_nonce(secretbox, &nonce, authorization_id, command, payload)
}

/// Encode an encrypted command frame under the given nonce
///
/// Layout: `nonce(24) || auth_id(u32) || len(u16) || tag(16) || ciphertext`, where the
/// plaintext is `auth_id || command || payload || crc16`.
///
/// # Errors
///
/// Returns an error if encryption fails or the ciphertext does not fit the length field.
pub fn encode_encrypted_frame_with_nonce(
    secretbox: &SecretBox,
    nonce: &[u8; sizes::COMMAND_NONCE],
    authorization_id: u32,
    command: CommandId,
    payload: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut plaintext = Vec::with_capacity(
        sizes::AUTHORIZATION_ID + sizes::COMMAND_ID + payload.len() + sizes::CRC,
    );
    plaintext.extend_from_slice(&authorization_id.to_le_bytes());
    plaintext.extend_from_slice(&command.to_le_bytes());
    plaintext.extend_from_slice(payload);
    append_crc(&mut plaintext);

    let sealed = secretbox.seal(nonce, &plaintext)?;
    let sealed_len = u16::try_from(sealed.len())
        .map_err(|_| CryptoError::EncryptionFailed(format!("{} byte ciphertext", sealed.len())))?;

    let mut frame = Vec::with_capacity(sizes::ENCRYPTED_HEADER + sealed.len());
    frame.extend_from_slice(nonce);
    frame
        .write_u32::<LittleEndian>(authorization_id)
        .and_then(|()| frame.write_u16::<LittleEndian>(sealed_len))
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    frame.extend_from_slice(&sealed);
    Ok(frame)
}

/// Outer envelope of an encrypted command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedFrame {
    /// Per-frame nonce
    pub nonce: [u8; sizes::COMMAND_NONCE],
    /// Authorization id in the clear header
    pub authorization_id: u32,
    /// Poly1305 tag followed by the ciphertext
    pub sealed: Bytes,
}

impl EncryptedFrame {
    /// Parse a complete envelope
    ///
    /// # Errors
    ///
    /// Returns an error if the header is truncated or the declared length does
    /// not match the bytes that follow it.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < sizes::ENCRYPTED_HEADER {
            return Err(FrameError::TooShort {
                len: bytes.len(),
                min: sizes::ENCRYPTED_HEADER,
            });
        }
        let (header, sealed) = bytes.split_at(sizes::ENCRYPTED_HEADER);
        let declared = usize::from(LittleEndian::read_u16(&header[28..30]));
        if declared != sealed.len() {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: sealed.len(),
            });
        }

        let mut nonce = [0u8; sizes::COMMAND_NONCE];
        nonce.copy_from_slice(&header[..sizes::COMMAND_NONCE]);
        Ok(Self {
            nonce,
            authorization_id: LittleEndian::read_u32(&header[24..28]),
            sealed: Bytes::copy_from_slice(sealed),
        })
    }

    /// Decrypt and validate the inner frame
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails, the plaintext is truncated or
    /// its CRC does not match.
    pub fn open(&self, secretbox: &SecretBox) -> Result<DecryptedFrame, FrameError> {
        let plaintext = secretbox.open(&self.nonce, &self.sealed)?;
        let min = sizes::AUTHORIZATION_ID + sizes::COMMAND_ID + sizes::CRC;
        if plaintext.len() < min {
            return Err(FrameError::TooShort {
                len: plaintext.len(),
                min,
            });
        }
        let body = split_crc(&plaintext)?;
        let (authorization_id, rest) = body.split_at(sizes::AUTHORIZATION_ID);
        let (command, payload) = rest.split_at(sizes::COMMAND_ID);
        Ok(DecryptedFrame {
            authorization_id: LittleEndian::read_u32(authorization_id),
            frame: Frame {
                command: CommandId(LittleEndian::read_u16(command)),
                payload: Bytes::copy_from_slice(payload),
            },
        })
    }
}

/// Plaintext recovered from an [`EncryptedFrame`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedFrame {
    /// Authorization id echoed inside the plaintext
    pub authorization_id: u32,
    /// Inner command frame
    pub frame: Frame,
}
