//! Test doubles for the transport layer
//!
//! [`SimulatedLock`] runs the lock side of the protocol in process, while
//! [`ScriptedTransport`] replays fixed byte sequences.

mod lock_simulator;
mod scripted;
mod simulated_lock;

pub use lock_simulator::{LockSimulator, LockSimulatorConfig};
pub use scripted::{ScriptedTransport, WriteLog};
pub use simulated_lock::{SimulatedCentral, SimulatedLock};
