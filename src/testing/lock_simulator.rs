//! Lock side of the pairing and command protocols
//!
//! [`LockSimulator`] answers complete client frames with the frames a lock
//! would send back. It verifies every authenticator and nonce the client
//! sends, so a client bug shows up as an ERROR frame rather than a silent pass.

use byteorder::{ByteOrder, LittleEndian};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use uuid::Uuid;

use crate::protocol::constants::{CommandId, error_codes, sizes, status};
use crate::protocol::crypto::{
    SecretBox, X25519KeyPair, X25519PublicKey, authenticator, derive_shared_secret,
    verify_authenticator,
};
use crate::protocol::frame::{EncryptedFrame, Frame, encode_encrypted_frame, encode_frame};
use crate::protocol::states::{LockAction, LockState};
use crate::types::{LockCredential, SharedSecret};

/// Behaviour of a simulated lock
#[derive(Debug, Clone)]
pub struct LockSimulatorConfig {
    /// Whether the lock hands out its public key
    pub pairing_mode: bool,
    /// Corrupt the authenticator in AUTHORIZATION_ID, as a man-in-the-middle would
    pub tamper_authorization_id: bool,
    /// Authorization id assigned to the next client
    pub authorization_id: u32,
    /// UUID of the lock
    pub lock_uuid: Uuid,
    /// Initial lock state
    pub lock_state: LockState,
    /// Send STATUS ACCEPTED and an intermediate NUKI_STATES before completing a lock action
    pub report_progress: bool,
}

impl Default for LockSimulatorConfig {
    fn default() -> Self {
        Self {
            pairing_mode: true,
            tamper_authorization_id: false,
            authorization_id: 0x0000_0003,
            lock_uuid: Uuid::from_u128(0x4e75_6b69_0000_4000_8000_0000_0000_0001),
            lock_state: LockState::Locked,
            report_progress: true,
        }
    }
}

#[derive(Default)]
struct PairingProgress {
    keypair: Option<X25519KeyPair>,
    client_public_key: Option<X25519PublicKey>,
    shared_secret: Option<SharedSecret>,
    challenges: Vec<[u8; sizes::PAIRING_NONCE]>,
    client_nonce: Option<[u8; sizes::PAIRING_NONCE]>,
}

/// Sans-IO lock protocol responder
pub struct LockSimulator<R = OsRng> {
    config: LockSimulatorConfig,
    rng: R,
    pairing: PairingProgress,
    credential: Option<LockCredential>,
    enrolled_app_id: Option<u32>,
    challenge: Option<[u8; sizes::PAIRING_NONCE]>,
    lock_state: LockState,
    actions: Vec<LockAction>,
}

impl LockSimulator<OsRng> {
    /// Create a simulator using the operating system RNG
    #[must_use]
    pub fn new(config: LockSimulatorConfig) -> Self {
        Self::with_rng(config, OsRng)
    }
}

impl<R: RngCore + CryptoRng> LockSimulator<R> {
    /// Create a simulator drawing keys and nonces from `rng`
    pub fn with_rng(config: LockSimulatorConfig, rng: R) -> Self {
        let lock_state = config.lock_state;
        Self {
            config,
            rng,
            pairing: PairingProgress::default(),
            credential: None,
            enrolled_app_id: None,
            challenge: None,
            lock_state,
            actions: Vec::new(),
        }
    }

    /// Pretend the lock was paired earlier with the given credential
    #[must_use]
    pub fn paired_with(mut self, credential: LockCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Credential created by the last successful pairing
    #[must_use]
    pub fn credential(&self) -> Option<&LockCredential> {
        self.credential.as_ref()
    }

    /// App id the client enrolled with
    #[must_use]
    pub fn enrolled_app_id(&self) -> Option<u32> {
        self.enrolled_app_id
    }

    /// Current lock state
    #[must_use]
    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    /// Lock actions executed so far
    #[must_use]
    pub fn actions(&self) -> &[LockAction] {
        &self.actions
    }

    /// Answer a complete frame written to the pairing characteristic
    pub fn handle_pairing(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let Ok(frame) = Frame::decode(bytes) else {
            return vec![error_frame(error_codes::ERROR_BAD_CRC, CommandId(0))];
        };

        let reply = match frame.command {
            CommandId::REQUEST_DATA => self.on_request_public_key(&frame.payload),
            CommandId::PUBLIC_KEY => self.on_client_public_key(&frame.payload),
            CommandId::AUTHORIZATION_AUTHENTICATOR => self.on_authenticator(&frame.payload),
            CommandId::AUTHORIZATION_DATA => self.on_authorization_data(&frame.payload),
            CommandId::AUTHORIZATION_ID_CONFIRMATION => self.on_confirmation(&frame.payload),
            _ => None,
        };
        vec![reply.unwrap_or_else(|| {
            error_frame(error_codes::P_ERROR_BAD_PARAMETER, frame.command)
        })]
    }

    fn on_request_public_key(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        if CommandId::from_prefix(payload)? != CommandId::PUBLIC_KEY {
            return None;
        }
        if !self.config.pairing_mode {
            return Some(error_frame(
                error_codes::P_ERROR_NOT_PAIRING,
                CommandId::REQUEST_DATA,
            ));
        }
        let keypair = X25519KeyPair::generate_with(&mut self.rng);
        let frame = encode_frame(CommandId::PUBLIC_KEY, keypair.public_key().as_bytes());
        self.pairing = PairingProgress {
            keypair: Some(keypair),
            ..PairingProgress::default()
        };
        Some(frame)
    }

    fn on_client_public_key(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let client = X25519PublicKey::from_bytes(payload).ok()?;
        let secret = derive_shared_secret(self.pairing.keypair.as_ref()?, &client);
        self.pairing.client_public_key = Some(client);
        self.pairing.shared_secret = Some(secret);
        Some(self.new_pairing_challenge())
    }

    fn on_authenticator(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let progress = &self.pairing;
        let secret = progress.shared_secret.as_ref()?;
        let lock_public = progress.keypair.as_ref()?.public_key();
        let client_public = progress.client_public_key.as_ref()?;
        let challenge = progress.challenges.first()?;

        let valid = verify_authenticator(
            secret,
            &[
                &client_public.as_bytes()[..],
                &lock_public.as_bytes()[..],
                &challenge[..],
            ],
            payload,
        )
        .ok()?;
        if !valid {
            return Some(error_frame(
                error_codes::P_ERROR_BAD_AUTHENTICATOR,
                CommandId::AUTHORIZATION_AUTHENTICATOR,
            ));
        }
        Some(self.new_pairing_challenge())
    }

    fn on_authorization_data(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        if payload.len() != sizes::AUTHENTICATOR + 5 + sizes::NAME + sizes::PAIRING_NONCE {
            return None;
        }
        let (auth, rest) = payload.split_at(sizes::AUTHENTICATOR);
        let (ids, rest) = rest.split_at(5);
        let (name, client_nonce) = rest.split_at(sizes::NAME);

        let secret = self.pairing.shared_secret.clone()?;
        let challenge = *self.pairing.challenges.get(1)?;
        let valid =
            verify_authenticator(&secret, &[ids, name, client_nonce, &challenge[..]], auth).ok()?;
        if !valid {
            return Some(error_frame(
                error_codes::P_ERROR_BAD_AUTHENTICATOR,
                CommandId::AUTHORIZATION_DATA,
            ));
        }

        let mut nonce = [0u8; sizes::PAIRING_NONCE];
        nonce.copy_from_slice(client_nonce);
        self.pairing.client_nonce = Some(nonce);
        self.enrolled_app_id = Some(LittleEndian::read_u32(&ids[1..5]));

        let auth_id = self.config.authorization_id.to_le_bytes();
        let uuid = *self.config.lock_uuid.as_bytes();
        let mut new_nonce = [0u8; sizes::PAIRING_NONCE];
        self.rng.fill_bytes(&mut new_nonce);
        self.pairing.challenges.push(new_nonce);

        let mut lock_auth = authenticator(
            &secret,
            &[&auth_id[..], &uuid[..], &new_nonce[..], &nonce[..]],
        )
        .ok()?;
        if self.config.tamper_authorization_id {
            lock_auth[0] ^= 0x01;
        }

        let mut reply = Vec::with_capacity(84);
        reply.extend_from_slice(&lock_auth);
        reply.extend_from_slice(&auth_id);
        reply.extend_from_slice(&uuid);
        reply.extend_from_slice(&new_nonce);
        Some(encode_frame(CommandId::AUTHORIZATION_ID, &reply))
    }

    fn on_confirmation(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        if payload.len() != sizes::AUTHENTICATOR + sizes::AUTHORIZATION_ID {
            return None;
        }
        let (auth, auth_id) = payload.split_at(sizes::AUTHENTICATOR);
        let secret = self.pairing.shared_secret.clone()?;
        let nonce = *self.pairing.challenges.get(2)?;

        let valid = auth_id == self.config.authorization_id.to_le_bytes()
            && verify_authenticator(&secret, &[auth_id, &nonce[..]], auth).ok()?;
        if !valid {
            return Some(error_frame(
                error_codes::P_ERROR_BAD_AUTHENTICATOR,
                CommandId::AUTHORIZATION_ID_CONFIRMATION,
            ));
        }

        self.credential = Some(LockCredential {
            lock_uuid: self.config.lock_uuid,
            authorization_id: self.config.authorization_id,
            shared_secret: secret,
        });
        self.pairing = PairingProgress::default();
        Some(encode_frame(CommandId::STATUS, &[status::COMPLETE]))
    }

    fn new_pairing_challenge(&mut self) -> Vec<u8> {
        let mut nonce = [0u8; sizes::PAIRING_NONCE];
        self.rng.fill_bytes(&mut nonce);
        self.pairing.challenges.push(nonce);
        encode_frame(CommandId::CHALLENGE, &nonce)
    }

    /// Answer a complete encrypted frame written to the user-specific characteristic
    pub fn handle_command(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let Some(credential) = self.credential.clone() else {
            return vec![error_frame(error_codes::ERROR_UNKNOWN, CommandId(0))];
        };
        let secretbox = SecretBox::new(&credential.shared_secret);

        let decrypted = match EncryptedFrame::parse(bytes).and_then(|f| f.open(&secretbox)) {
            Ok(d) if d.authorization_id == credential.authorization_id => d,
            _ => return vec![error_frame(error_codes::ERROR_UNKNOWN, CommandId(0))],
        };
        let frame = decrypted.frame;

        let replies: Vec<(CommandId, Vec<u8>)> = match frame.command {
            CommandId::REQUEST_DATA => match CommandId::from_prefix(&frame.payload) {
                Some(CommandId::CHALLENGE) => {
                    let mut nonce = [0u8; sizes::PAIRING_NONCE];
                    self.rng.fill_bytes(&mut nonce);
                    self.challenge = Some(nonce);
                    vec![(CommandId::CHALLENGE, nonce.to_vec())]
                }
                Some(CommandId::NUKI_STATES) => {
                    vec![(CommandId::NUKI_STATES, self.states_payload())]
                }
                _ => vec![device_error(
                    error_codes::K_ERROR_BAD_PARAMETER,
                    CommandId::REQUEST_DATA,
                )],
            },
            CommandId::LOCK_ACTION => self.on_lock_action(&frame.payload),
            other => vec![device_error(error_codes::K_ERROR_BAD_PARAMETER, other)],
        };

        replies
            .into_iter()
            .filter_map(|(command, payload)| {
                encode_encrypted_frame(
                    &secretbox,
                    credential.authorization_id,
                    command,
                    &payload,
                    &mut self.rng,
                )
                .ok()
            })
            .collect()
    }

    fn on_lock_action(&mut self, payload: &[u8]) -> Vec<(CommandId, Vec<u8>)> {
        if payload.len() != 1 + 4 + 1 + sizes::PAIRING_NONCE {
            return vec![device_error(
                error_codes::K_ERROR_BAD_PARAMETER,
                CommandId::LOCK_ACTION,
            )];
        }
        if self.challenge.take().as_ref().map(|n| &n[..]) != Some(&payload[6..]) {
            return vec![device_error(
                error_codes::K_ERROR_BAD_NONCE,
                CommandId::LOCK_ACTION,
            )];
        }

        let action = LockAction::from(payload[0]);
        self.actions.push(action);
        self.lock_state = match action {
            LockAction::Unlock | LockAction::LockNGo => LockState::Unlocked,
            LockAction::Lock | LockAction::FullLock => LockState::Locked,
            LockAction::Unlatch | LockAction::LockNGoWithUnlatch => LockState::Unlatched,
            _ => self.lock_state,
        };

        let mut replies = Vec::new();
        if self.config.report_progress {
            replies.push((CommandId::STATUS, vec![status::ACCEPTED]));
            replies.push((CommandId::NUKI_STATES, self.states_payload()));
        }
        replies.push((CommandId::STATUS, vec![status::COMPLETE]));
        replies
    }

    fn states_payload(&self) -> Vec<u8> {
        let mut payload = vec![0u8; 18];
        payload[0] = 2;
        payload[1] = self.lock_state.into();
        payload[3..5].copy_from_slice(&2024u16.to_le_bytes());
        payload[5..10].copy_from_slice(&[6, 15, 12, 30, 0]);
        if let Some(action) = self.actions.last() {
            payload[15] = (*action).into();
        }
        payload
    }
}

fn device_error(code: u8, command: CommandId) -> (CommandId, Vec<u8>) {
    let mut payload = vec![code];
    payload.extend_from_slice(&command.to_le_bytes());
    (CommandId::ERROR, payload)
}

fn error_frame(code: u8, command: CommandId) -> Vec<u8> {
    let (id, payload) = device_error(code, command);
    encode_frame(id, &payload)
}
