//! Protocol module
//!
//! Everything here is sans-IO: sessions consume notification bytes and hand
//! back frames to write, leaving transport and timing to the caller.

#![allow(missing_docs)]

pub mod command;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod pairing;
pub mod states;

pub use error::{DeviceError, DeviceErrorKind, ProtocolError};
