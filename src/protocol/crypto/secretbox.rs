//! XSalsa20-Poly1305 (NaCl `crypto_secretbox`) for the command channel
//!
//! NaCl's boxed output starts with 16 zero bytes that the lock does not
//! transmit. What goes over the air is the 16-byte Poly1305 tag followed by
//! the XSalsa20 ciphertext, so the tag is handled detached here.

use xsalsa20poly1305::aead::{AeadInPlace, KeyInit};
use xsalsa20poly1305::{Key, Nonce, Tag, XSalsa20Poly1305};

use super::{CryptoError, lengths};
use crate::types::SharedSecret;

/// Authenticated cipher keyed by the lock's shared secret
pub struct SecretBox {
    cipher: XSalsa20Poly1305,
}

impl SecretBox {
    /// Create the cipher from the long-term shared secret
    #[must_use]
    pub fn new(key: &SharedSecret) -> Self {
        let cipher = XSalsa20Poly1305::new(Key::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Encrypt `plaintext`, returning `tag || ciphertext`
    pub fn seal(&self, nonce: &[u8; 24], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut sealed = Vec::with_capacity(lengths::SECRETBOX_TAG + buffer.len());
        sealed.extend_from_slice(&tag);
        sealed.extend_from_slice(&buffer);
        Ok(sealed)
    }

    /// Verify and decrypt `tag || ciphertext`
    ///
    /// Fails without releasing any plaintext when the tag does not verify.
    pub fn open(&self, nonce: &[u8; 24], sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < lengths::SECRETBOX_TAG {
            return Err(CryptoError::CiphertextTooShort { len: sealed.len() });
        }
        let (tag, ciphertext) = sealed.split_at(lengths::SECRETBOX_TAG);
        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        Ok(buffer)
    }
}
