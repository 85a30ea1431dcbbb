//! # nukible
//!
//! A pure Rust client for the Bluetooth LE protocol of Nuki smart locks.
//!
//! ## Features
//!
//! - Pairing: key agreement and mutual authentication with a lock in pairing mode
//! - Lock actions (lock, unlock, unlatch, lock'n'go, ...) over the encrypted channel
//! - Lock state queries, decoded into [`NukiStates`]
//! - Watching advertisements for state changes
//! - Credential persistence compatible with the JSON configuration file layout
//!
//! The crate does not drive a Bluetooth adapter. Plug a backend in through the
//! [`transport::Central`] and [`transport::LockTransport`] traits.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nukible::testing::{LockSimulatorConfig, SimulatedCentral, SimulatedLock};
//! use nukible::transport::Peripheral;
//! use nukible::{ClientIdentity, NukiClient, NukiConfig};
//!
//! # async fn example(credential: nukible::LockCredential) -> Result<(), nukible::NukiError> {
//! let client = NukiClient::new(NukiConfig::default());
//! let identity = ClientIdentity::generate("nukible");
//! let mut central = SimulatedCentral::new()
//!     .with_lock("lock-1", SimulatedLock::new(LockSimulatorConfig::default()));
//!
//! let connection = client
//!     .connect(&mut central, &Peripheral::new("lock-1", "Nuki_1A2B3C4D"))
//!     .await?;
//! let states = connection.get_state(&credential, &identity).await?;
//! println!("lock is {}", states.lock_state_str());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **High-level**: [`NukiClient`] and [`LockConnection`] run whole exchanges
//!   over a transport with timeouts
//! - **Low-level**: [`protocol`] holds sans-IO pairing and command sessions, the
//!   frame codec and the crypto primitives

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Error types
pub mod error;
/// Credential persistence
pub mod storage;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

mod client;
pub mod protocol;
pub mod transport;
pub mod watch;

pub use client::{LockConnection, NukiClient, PairingOutcome, run_pairing};
pub use error::{NukiError, Result};
pub use protocol::states::{LockAction, LockState, NukiStates};
pub use storage::{CredentialStore, FileStore, MemoryStore};
pub use types::{
    AppType, ClientIdentity, LockCredential, NukiConfig, NukiConfigBuilder, PairedLock,
    SharedSecret,
};
