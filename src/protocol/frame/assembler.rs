//! Reassembly of notification fragments into complete frames

use byteorder::{ByteOrder, LittleEndian};
use bytes::BytesMut;

use super::FrameError;
use super::codec::{EncryptedFrame, Frame, crc_valid};
use crate::protocol::constants::{CommandId, sizes};

/// Total length of a pairing frame, by command id
#[must_use]
pub fn pairing_frame_len(command: CommandId) -> Option<usize> {
    let payload = match command {
        CommandId::PUBLIC_KEY => sizes::PUBLIC_KEY,
        CommandId::CHALLENGE => sizes::PAIRING_NONCE,
        CommandId::AUTHORIZATION_ID => {
            sizes::AUTHENTICATOR + sizes::AUTHORIZATION_ID + sizes::LOCK_UUID + sizes::PAIRING_NONCE
        }
        CommandId::STATUS => 1,
        CommandId::ERROR => 3,
        _ => return None,
    };
    Some(sizes::COMMAND_ID + payload + sizes::CRC)
}

/// Accumulates pairing frames, which carry no length field
#[derive(Debug, Default)]
pub struct PairingFrameAssembler {
    buffer: BytesMut,
}

impl PairingFrameAssembler {
    /// Create an empty assembler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes buffered so far
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append a fragment, returning the frame once its expected length is reached
    ///
    /// # Errors
    ///
    /// Fails on a command id with no known pairing length, on more bytes than
    /// that length, or on a CRC mismatch of the complete frame.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<Frame>, FrameError> {
        self.buffer.extend_from_slice(chunk);
        let Some(command) = CommandId::from_prefix(&self.buffer) else {
            return Ok(None);
        };
        let expected = pairing_frame_len(command).ok_or(FrameError::UnknownCommand(command))?;

        match self.buffer.len() {
            len if len < expected => Ok(None),
            len if len > expected => Err(FrameError::Overlong {
                expected,
                actual: len,
            }),
            _ => {
                let bytes = self.buffer.split();
                Frame::decode(&bytes).map(Some)
            }
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// A complete frame received on the command channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Unencrypted STATUS or ERROR frame
    Plain(Frame),
    /// Encrypted envelope, still to be opened
    Encrypted(EncryptedFrame),
}

/// Accumulates encrypted frames using their declared ciphertext length
#[derive(Debug)]
pub struct EncryptedFrameAssembler {
    buffer: BytesMut,
    max_frame_len: usize,
}

impl EncryptedFrameAssembler {
    /// Create an assembler that rejects ciphertexts longer than `max_frame_len`
    #[must_use]
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_len,
        }
    }

    /// Bytes buffered so far
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append a fragment, returning a frame once complete
    ///
    /// # Errors
    ///
    /// Fails when the declared length exceeds the limit, when more bytes
    /// arrive than were declared, or when the complete frame does not parse.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<Incoming>, FrameError> {
        if self.buffer.is_empty() {
            if let Some(frame) = plain_frame(chunk) {
                return Ok(Some(Incoming::Plain(frame)));
            }
        }

        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() < sizes::ENCRYPTED_HEADER {
            return Ok(None);
        }

        let declared = usize::from(LittleEndian::read_u16(
            &self.buffer[sizes::ENCRYPTED_HEADER - 2..sizes::ENCRYPTED_HEADER],
        ));
        if declared > self.max_frame_len {
            return Err(FrameError::TooLarge {
                size: declared,
                max: self.max_frame_len,
            });
        }

        let expected = sizes::ENCRYPTED_HEADER + declared;
        match self.buffer.len() {
            len if len < expected => Ok(None),
            len if len > expected => Err(FrameError::Overlong {
                expected,
                actual: len,
            }),
            _ => {
                let bytes = self.buffer.split();
                EncryptedFrame::parse(&bytes).map(|f| Some(Incoming::Encrypted(f)))
            }
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Recognise a plaintext STATUS or ERROR frame sent in a single fragment
fn plain_frame(chunk: &[u8]) -> Option<Frame> {
    let command = CommandId::from_prefix(chunk)?;
    if !matches!(command, CommandId::STATUS | CommandId::ERROR) {
        return None;
    }
    if pairing_frame_len(command) != Some(chunk.len()) || !crc_valid(chunk) {
        return None;
    }
    Frame::decode(chunk).ok()
}
