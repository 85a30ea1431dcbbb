//! Cryptographic primitives for Nuki pairing and the encrypted command channel

mod authenticator;
mod error;
mod hsalsa20;
mod secretbox;
#[cfg(test)]
mod tests;
mod x25519;

pub use self::authenticator::{authenticator, verify_authenticator};
pub use self::error::CryptoError;
pub use self::hsalsa20::{derive_shared_secret, hsalsa20};
pub use self::secretbox::SecretBox;
pub use self::x25519::{X25519KeyPair, X25519PublicKey, X25519SharedSecret};

/// Length of various cryptographic values
pub mod lengths {
    /// X25519 public key length
    pub const X25519_PUBLIC_KEY: usize = 32;
    /// X25519 shared secret length
    pub const X25519_SHARED_SECRET: usize = 32;
    /// Long-term shared key length
    pub const SHARED_SECRET: usize = 32;
    /// HSalsa20 input block length
    pub const HSALSA20_INPUT: usize = 16;
    /// XSalsa20-Poly1305 nonce length
    pub const SECRETBOX_NONCE: usize = 24;
    /// Poly1305 tag length
    pub const SECRETBOX_TAG: usize = 16;
    /// HMAC-SHA256 output length
    pub const AUTHENTICATOR: usize = 32;
}
