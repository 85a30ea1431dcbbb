//! Client side of the Nuki pairing handshake
//!
//! The session is sans-IO: the driver writes whatever [`PairingSession::start`]
//! and [`PairingSession::feed`] hand back to the pairing characteristic and
//! feeds every notification fragment into [`PairingSession::feed`].

use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::protocol::constants::{CommandId, sizes, status};
use crate::protocol::crypto::{
    X25519KeyPair, X25519PublicKey, authenticator, derive_shared_secret, verify_authenticator,
};
use crate::protocol::error::{DeviceError, DeviceErrorKind, ProtocolError};
use crate::protocol::frame::{Frame, PairingFrameAssembler, encode_frame};
use crate::types::{ClientIdentity, LockCredential, SharedSecret};

/// Pairing session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    /// Public key not requested yet
    Idle,
    /// Waiting for the lock's public key
    AwaitPublicKey,
    /// Our public key sent, waiting for the first challenge
    AwaitChallenge,
    /// Authenticator sent, waiting for the second challenge
    AwaitSecondChallenge,
    /// Authorization data sent, waiting for the authorization id
    AwaitAuthorizationId,
    /// Confirmation sent, waiting for STATUS COMPLETE
    AwaitStatusComplete,
    /// Pairing succeeded
    Paired,
    /// Lock is not in pairing mode
    NotInPairingMode,
    /// Pairing failed
    Failed,
}

impl PairingState {
    /// Whether no further input is accepted
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paired | Self::NotInPairingMode | Self::Failed)
    }
}

impl fmt::Display for PairingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of feeding data into the session
#[derive(Debug)]
pub enum PairingStep {
    /// Write this frame to the pairing characteristic
    Send(Vec<u8>),
    /// Wait for more notification data
    NeedData,
    /// Pairing finished
    Complete(LockCredential),
    /// The lock refused to hand out its public key; try another lock
    NotInPairingMode,
}

/// One pairing attempt against one lock
pub struct PairingSession<R = OsRng> {
    state: PairingState,
    identity: ClientIdentity,
    rng: R,
    assembler: PairingFrameAssembler,
    keypair: Option<X25519KeyPair>,
    lock_public_key: Option<X25519PublicKey>,
    shared_secret: Option<SharedSecret>,
    own_nonce: Option<Zeroizing<[u8; sizes::PAIRING_NONCE]>>,
    pending: Option<(u32, Uuid)>,
}

impl PairingSession<OsRng> {
    /// Create a session using the operating system RNG
    #[must_use]
    pub fn new(identity: ClientIdentity) -> Self {
        Self::with_rng(identity, OsRng)
    }
}

impl<R: RngCore + CryptoRng> PairingSession<R> {
    /// Create a session drawing key material and nonces from `rng`
    pub fn with_rng(identity: ClientIdentity, rng: R) -> Self {
        Self {
            state: PairingState::Idle,
            identity,
            rng,
            assembler: PairingFrameAssembler::new(),
            keypair: None,
            lock_public_key: None,
            shared_secret: None,
            own_nonce: None,
            pending: None,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> PairingState {
        self.state
    }

    /// Begin pairing, returning the public key request
    ///
    /// # Errors
    ///
    /// Returns error if the session was already started
    pub fn start(&mut self) -> Result<Vec<u8>, ProtocolError> {
        if self.state != PairingState::Idle {
            return Err(ProtocolError::InvalidState {
                expected: PairingState::Idle.to_string(),
                actual: self.state.to_string(),
            });
        }

        tracing::debug!("Requesting lock public key");
        self.state = PairingState::AwaitPublicKey;
        Ok(encode_frame(
            CommandId::REQUEST_DATA,
            &CommandId::PUBLIC_KEY.to_le_bytes(),
        ))
    }

    /// Feed a notification fragment from the pairing characteristic
    ///
    /// # Errors
    ///
    /// Any error ends the session in [`PairingState::Failed`] and discards the
    /// key material derived so far.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<PairingStep, ProtocolError> {
        if self.state.is_terminal() || self.state == PairingState::Idle {
            return Err(ProtocolError::InvalidState {
                expected: "an active pairing state".to_string(),
                actual: self.state.to_string(),
            });
        }

        tracing::trace!(len = chunk.len(), state = %self.state, "Pairing fragment");
        let result = match self.assembler.push(chunk) {
            Ok(Some(frame)) => self.handle_frame(&frame),
            Ok(None) => Ok(PairingStep::NeedData),
            Err(e) => Err(e.into_protocol(&self.state.to_string())),
        };

        if let Err(e) = &result {
            if e.is_security_relevant() {
                tracing::error!(target: "nukible::security", state = %self.state, "Pairing aborted: {e}");
            } else {
                tracing::warn!(state = %self.state, "Pairing failed: {e}");
            }
            self.finish(PairingState::Failed);
        }
        result
    }

    fn handle_frame(&mut self, frame: &Frame) -> Result<PairingStep, ProtocolError> {
        tracing::trace!(command = %frame.command, len = frame.payload.len(), "Pairing frame");

        if frame.command == CommandId::ERROR {
            let error = DeviceError::from_payload(&frame.payload).ok_or_else(|| {
                ProtocolError::MalformedFrame {
                    reason: "empty ERROR payload".to_string(),
                }
            })?;
            if self.state == PairingState::AwaitPublicKey
                && error.kind == DeviceErrorKind::NotPairing
            {
                tracing::info!("Lock is not in pairing mode");
                self.finish(PairingState::NotInPairingMode);
                return Ok(PairingStep::NotInPairingMode);
            }
            return Err(ProtocolError::Device(error));
        }

        match (self.state, frame.command) {
            (PairingState::AwaitPublicKey, CommandId::PUBLIC_KEY) => {
                self.on_public_key(&frame.payload)
            }
            (PairingState::AwaitChallenge, CommandId::CHALLENGE) => {
                self.on_first_challenge(&frame.payload)
            }
            (PairingState::AwaitSecondChallenge, CommandId::CHALLENGE) => {
                self.on_second_challenge(&frame.payload)
            }
            (PairingState::AwaitAuthorizationId, CommandId::AUTHORIZATION_ID) => {
                self.on_authorization_id(&frame.payload)
            }
            (PairingState::AwaitStatusComplete, CommandId::STATUS) => {
                self.on_status(&frame.payload)
            }
            (state, command) => Err(ProtocolError::UnexpectedCommand {
                state: state.to_string(),
                command,
            }),
        }
    }

    fn on_public_key(&mut self, payload: &[u8]) -> Result<PairingStep, ProtocolError> {
        let lock_public_key = X25519PublicKey::from_bytes(payload)?;
        let keypair = X25519KeyPair::generate_with(&mut self.rng);
        let shared_secret = derive_shared_secret(&keypair, &lock_public_key);
        tracing::debug!("Derived shared secret, sending client public key");

        let frame = encode_frame(CommandId::PUBLIC_KEY, keypair.public_key().as_bytes());
        self.keypair = Some(keypair);
        self.lock_public_key = Some(lock_public_key);
        self.shared_secret = Some(shared_secret);
        self.state = PairingState::AwaitChallenge;
        Ok(PairingStep::Send(frame))
    }

    fn on_first_challenge(&mut self, nonce: &[u8]) -> Result<PairingStep, ProtocolError> {
        let (Some(keypair), Some(lock_public_key)) = (&self.keypair, &self.lock_public_key) else {
            return Err(self.missing("key pair"));
        };
        let secret = self.secret()?;
        let auth = authenticator(
            secret,
            &[
                &keypair.public_key().as_bytes()[..],
                &lock_public_key.as_bytes()[..],
                nonce,
            ],
        )?;

        tracing::debug!("Sending authorization authenticator");
        self.state = PairingState::AwaitSecondChallenge;
        Ok(PairingStep::Send(encode_frame(
            CommandId::AUTHORIZATION_AUTHENTICATOR,
            &auth,
        )))
    }

    fn on_second_challenge(&mut self, lock_nonce: &[u8]) -> Result<PairingStep, ProtocolError> {
        let mut ids = [0u8; 1 + 4];
        ids[0] = self.identity.app_type.into();
        ids[1..].copy_from_slice(&self.identity.app_id.to_le_bytes());
        let name = self.identity.padded_name();

        let mut own_nonce = Zeroizing::new([0u8; sizes::PAIRING_NONCE]);
        self.rng.fill_bytes(&mut own_nonce[..]);

        let auth = authenticator(
            self.secret()?,
            &[&ids[..], &name[..], &own_nonce[..], lock_nonce],
        )?;

        let mut payload =
            Vec::with_capacity(sizes::AUTHENTICATOR + ids.len() + name.len() + own_nonce.len());
        payload.extend_from_slice(&auth);
        payload.extend_from_slice(&ids);
        payload.extend_from_slice(&name);
        payload.extend_from_slice(&own_nonce[..]);

        tracing::debug!(app_id = self.identity.app_id, "Sending authorization data");
        self.own_nonce = Some(own_nonce);
        self.state = PairingState::AwaitAuthorizationId;
        Ok(PairingStep::Send(encode_frame(
            CommandId::AUTHORIZATION_DATA,
            &payload,
        )))
    }

    fn on_authorization_id(&mut self, payload: &[u8]) -> Result<PairingStep, ProtocolError> {
        let (lock_auth, rest) = payload.split_at(sizes::AUTHENTICATOR);
        let (auth_id_bytes, rest) = rest.split_at(sizes::AUTHORIZATION_ID);
        let (uuid_bytes, new_nonce) = rest.split_at(sizes::LOCK_UUID);

        let Some(own_nonce) = &self.own_nonce else {
            return Err(self.missing("client nonce"));
        };
        let secret = self.secret()?;

        let verified = verify_authenticator(
            secret,
            &[auth_id_bytes, uuid_bytes, new_nonce, &own_nonce[..]],
            lock_auth,
        )?;
        if !verified {
            return Err(ProtocolError::AuthenticationFailed {
                reason: "lock authenticator in AUTHORIZATION_ID does not verify, possible man-in-the-middle"
                    .to_string(),
            });
        }

        let confirmation = authenticator(secret, &[auth_id_bytes, new_nonce])?;
        let mut reply = Vec::with_capacity(sizes::AUTHENTICATOR + sizes::AUTHORIZATION_ID);
        reply.extend_from_slice(&confirmation);
        reply.extend_from_slice(auth_id_bytes);

        let authorization_id = u32::from_le_bytes([
            auth_id_bytes[0],
            auth_id_bytes[1],
            auth_id_bytes[2],
            auth_id_bytes[3],
        ]);
        let lock_uuid = Uuid::from_slice(uuid_bytes).map_err(|e| ProtocolError::MalformedFrame {
            reason: e.to_string(),
        })?;
        tracing::info!(authorization_id, %lock_uuid, "Lock assigned authorization id");

        self.pending = Some((authorization_id, lock_uuid));
        self.state = PairingState::AwaitStatusComplete;
        Ok(PairingStep::Send(encode_frame(
            CommandId::AUTHORIZATION_ID_CONFIRMATION,
            &reply,
        )))
    }

    fn on_status(&mut self, payload: &[u8]) -> Result<PairingStep, ProtocolError> {
        match payload.first().copied() {
            Some(status::COMPLETE) => {
                let (Some((authorization_id, lock_uuid)), Some(shared_secret)) =
                    (self.pending, self.shared_secret.take())
                else {
                    return Err(self.missing("authorization id"));
                };
                tracing::info!(authorization_id, "Pairing complete");
                self.finish(PairingState::Paired);
                Ok(PairingStep::Complete(LockCredential {
                    lock_uuid,
                    authorization_id,
                    shared_secret,
                }))
            }
            Some(status::ACCEPTED) => Ok(PairingStep::NeedData),
            other => Err(ProtocolError::MalformedFrame {
                reason: format!("unexpected status {other:?}"),
            }),
        }
    }

    fn secret(&self) -> Result<&SharedSecret, ProtocolError> {
        self.shared_secret
            .as_ref()
            .ok_or_else(|| self.missing("shared secret"))
    }

    fn missing(&self, what: &str) -> ProtocolError {
        ProtocolError::InvalidState {
            expected: format!("{what} present"),
            actual: self.state.to_string(),
        }
    }

    /// Enter a terminal state and drop all key material
    fn finish(&mut self, state: PairingState) {
        self.state = state;
        self.keypair = None;
        self.lock_public_key = None;
        self.shared_secret = None;
        self.own_nonce = None;
        self.pending = None;
        self.assembler.reset();
    }
}

impl<R> fmt::Debug for PairingSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingSession")
            .field("state", &self.state)
            .field("app_id", &self.identity.app_id)
            .finish_non_exhaustive()
    }
}
