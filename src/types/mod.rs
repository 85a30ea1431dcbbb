//! Core types module

mod config;
mod credential;
mod identity;

#[cfg(test)]
mod tests;

pub use config::{NukiConfig, NukiConfigBuilder};
pub use credential::{LockCredential, PairedLock, SharedSecret};
pub use identity::{AppType, ClientIdentity};
