//! Encrypted request/response exchange with a paired lock
//!
//! Every command starts by asking the lock for a challenge nonce. Lock actions
//! echo that nonce in their payload and finish with STATUS COMPLETE, state
//! queries finish with a NUKI_STATES frame.

use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::protocol::constants::{CommandId, sizes, status};
use crate::protocol::crypto::SecretBox;
use crate::protocol::error::{DeviceError, ProtocolError};
use crate::protocol::frame::{
    EncryptedFrame, EncryptedFrameAssembler, Frame, Incoming, encode_encrypted_frame,
};
use crate::protocol::states::{LockAction, NukiStates};
use crate::types::{ClientIdentity, LockCredential};

/// What the session should do once it holds a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Perform a lock action
    LockAction(LockAction),
    /// Read the lock state
    GetState,
}

/// Command session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Challenge not requested yet
    Idle,
    /// Waiting for the challenge nonce
    AwaitChallenge,
    /// Command sent, waiting for its result
    AwaitResult,
    /// Terminal success
    Complete,
    /// Terminal failure
    Failed,
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Successful result of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Lock action completed
    Done,
    /// Lock state snapshot
    States(NukiStates),
}

/// Result of feeding data into the session
#[derive(Debug)]
pub enum CommandStep {
    /// Write this frame to the user-specific characteristic
    Send(Vec<u8>),
    /// Wait for more notification data
    NeedData,
    /// Command finished
    Complete(CommandOutcome),
}

/// One encrypted command against one lock
pub struct CommandSession<R = OsRng> {
    state: CommandState,
    kind: CommandKind,
    app_id: u32,
    authorization_id: u32,
    secretbox: SecretBox,
    rng: R,
    assembler: EncryptedFrameAssembler,
}

impl CommandSession<OsRng> {
    /// Create a session using the operating system RNG
    #[must_use]
    pub fn new(
        kind: CommandKind,
        credential: &LockCredential,
        identity: &ClientIdentity,
        max_frame_len: usize,
    ) -> Self {
        Self::with_rng(kind, credential, identity, max_frame_len, OsRng)
    }
}

impl<R: RngCore + CryptoRng> CommandSession<R> {
    /// Create a session drawing nonces from `rng`
    pub fn with_rng(
        kind: CommandKind,
        credential: &LockCredential,
        identity: &ClientIdentity,
        max_frame_len: usize,
        rng: R,
    ) -> Self {
        Self {
            state: CommandState::Idle,
            kind,
            app_id: identity.app_id,
            authorization_id: credential.authorization_id,
            secretbox: SecretBox::new(&credential.shared_secret),
            rng,
            assembler: EncryptedFrameAssembler::new(max_frame_len),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Kind of command this session performs
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Begin the command, returning the encrypted challenge request
    ///
    /// # Errors
    ///
    /// Returns error if the session was already started or encryption fails
    pub fn start(&mut self) -> Result<Vec<u8>, ProtocolError> {
        if self.state != CommandState::Idle {
            return Err(ProtocolError::InvalidState {
                expected: CommandState::Idle.to_string(),
                actual: self.state.to_string(),
            });
        }

        tracing::debug!(kind = ?self.kind, "Requesting challenge");
        let frame = self
            .encrypt(CommandId::REQUEST_DATA, &CommandId::CHALLENGE.to_le_bytes())
            .inspect_err(|_| self.state = CommandState::Failed)?;
        self.state = CommandState::AwaitChallenge;
        Ok(frame)
    }

    /// Feed a notification fragment from the user-specific characteristic
    ///
    /// # Errors
    ///
    /// Any error ends the session in [`CommandState::Failed`].
    pub fn feed(&mut self, chunk: &[u8]) -> Result<CommandStep, ProtocolError> {
        if !matches!(
            self.state,
            CommandState::AwaitChallenge | CommandState::AwaitResult
        ) {
            return Err(ProtocolError::InvalidState {
                expected: "an active command state".to_string(),
                actual: self.state.to_string(),
            });
        }

        tracing::trace!(len = chunk.len(), state = %self.state, "Command fragment");
        let result = match self.assembler.push(chunk) {
            Ok(Some(Incoming::Plain(frame))) => self.handle_frame(&frame),
            Ok(Some(Incoming::Encrypted(envelope))) => self.handle_encrypted(&envelope),
            Ok(None) => Ok(CommandStep::NeedData),
            Err(e) => Err(e.into_protocol(&self.state.to_string())),
        };

        match &result {
            Ok(CommandStep::Complete(_)) => self.finish(CommandState::Complete),
            Ok(_) => {}
            Err(e) => {
                if e.is_security_relevant() {
                    tracing::error!(target: "nukible::security", state = %self.state, "Command aborted: {e}");
                } else {
                    tracing::warn!(state = %self.state, "Command failed: {e}");
                }
                self.finish(CommandState::Failed);
            }
        }
        result
    }

    fn handle_encrypted(&mut self, envelope: &EncryptedFrame) -> Result<CommandStep, ProtocolError> {
        let decrypted = envelope
            .open(&self.secretbox)
            .map_err(|e| e.into_protocol(&self.state.to_string()))?;
        if decrypted.authorization_id != self.authorization_id {
            return Err(ProtocolError::AuthorizationMismatch {
                expected: self.authorization_id,
                actual: decrypted.authorization_id,
            });
        }
        self.handle_frame(&decrypted.frame)
    }

    fn handle_frame(&mut self, frame: &Frame) -> Result<CommandStep, ProtocolError> {
        tracing::trace!(command = %frame.command, len = frame.payload.len(), "Command frame");

        match (self.state, frame.command) {
            (_, CommandId::ERROR) => Err(DeviceError::from_payload(&frame.payload).map_or_else(
                || ProtocolError::MalformedFrame {
                    reason: "empty ERROR payload".to_string(),
                },
                ProtocolError::Device,
            )),
            (CommandState::AwaitChallenge, CommandId::CHALLENGE) => self.on_challenge(&frame.payload),
            (CommandState::AwaitResult, CommandId::STATUS) => self.on_status(&frame.payload),
            (CommandState::AwaitResult, CommandId::NUKI_STATES) => match self.kind {
                CommandKind::GetState => {
                    let states = NukiStates::decode(&frame.payload)?;
                    tracing::debug!(lock_state = states.lock_state_str(), "Received lock state");
                    Ok(CommandStep::Complete(CommandOutcome::States(states)))
                }
                CommandKind::LockAction(_) => {
                    tracing::debug!("Ignoring intermediate NUKI_STATES");
                    Ok(CommandStep::NeedData)
                }
            },
            (state, command) => Err(ProtocolError::UnexpectedCommand {
                state: state.to_string(),
                command,
            }),
        }
    }

    fn on_challenge(&mut self, nonce: &[u8]) -> Result<CommandStep, ProtocolError> {
        if nonce.len() != sizes::PAIRING_NONCE {
            return Err(ProtocolError::MalformedFrame {
                reason: format!("challenge of {} bytes", nonce.len()),
            });
        }

        let frame = match self.kind {
            CommandKind::LockAction(action) => {
                let mut payload = Vec::with_capacity(1 + 4 + 1 + nonce.len());
                payload.push(action.into());
                payload.extend_from_slice(&self.app_id.to_le_bytes());
                payload.push(0); // flags
                payload.extend_from_slice(nonce);
                tracing::debug!(%action, "Sending lock action");
                self.encrypt(CommandId::LOCK_ACTION, &payload)?
            }
            CommandKind::GetState => {
                tracing::debug!("Requesting lock state");
                self.encrypt(
                    CommandId::REQUEST_DATA,
                    &CommandId::NUKI_STATES.to_le_bytes(),
                )?
            }
        };
        self.state = CommandState::AwaitResult;
        Ok(CommandStep::Send(frame))
    }

    fn on_status(&self, payload: &[u8]) -> Result<CommandStep, ProtocolError> {
        match payload.first().copied() {
            Some(status::COMPLETE) if matches!(self.kind, CommandKind::LockAction(_)) => {
                tracing::debug!("Lock reported completion");
                Ok(CommandStep::Complete(CommandOutcome::Done))
            }
            Some(status::ACCEPTED) => {
                tracing::debug!("Lock accepted command");
                Ok(CommandStep::NeedData)
            }
            other => Err(ProtocolError::MalformedFrame {
                reason: format!("unexpected status {other:?} for {:?}", self.kind),
            }),
        }
    }

    fn encrypt(&mut self, command: CommandId, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        Ok(encode_encrypted_frame(
            &self.secretbox,
            self.authorization_id,
            command,
            payload,
            &mut self.rng,
        )?)
    }

    fn finish(&mut self, state: CommandState) {
        self.state = state;
        self.assembler.reset();
    }
}

impl<R> fmt::Debug for CommandSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSession")
            .field("state", &self.state)
            .field("kind", &self.kind)
            .field("authorization_id", &self.authorization_id)
            .finish_non_exhaustive()
    }
}
