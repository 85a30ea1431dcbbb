//! Nuki pairing protocol
//!
//! Exchanges Curve25519 public keys with the lock, derives the long-term
//! shared secret and enrolls the client, which yields a [`LockCredential`].
//!
//! [`LockCredential`]: crate::types::LockCredential

mod session;


pub use session::{PairingSession, PairingState, PairingStep};
