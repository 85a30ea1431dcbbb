//! HSalsa20 core used to turn the raw X25519 output into the long-term key
//!
//! This is NaCl's `crypto_core_hsalsa20` with a zero input block, i.e. what
//! `crypto_box_beforenm` computes. Locks derive their copy of the key this
//! way, so the raw DH output must never be used directly.

use salsa20::cipher::consts::U10;
use salsa20::cipher::generic_array::GenericArray;
use zeroize::Zeroize;

use super::{X25519KeyPair, X25519PublicKey};
use crate::types::SharedSecret;

/// Compute HSalsa20/20(`key`, `input`) under the "expand 32-byte k" constant
///
/// The output is the diagonal and input words of the permuted state, without
/// the Salsa20 feed-forward.
#[must_use]
pub fn hsalsa20(key: &[u8; 32], input: &[u8; 16]) -> [u8; 32] {
    // ten double rounds
    let mut block = salsa20::hsalsa::<U10>(
        GenericArray::from_slice(key),
        GenericArray::from_slice(input),
    );
    let mut out = [0u8; 32];
    out.copy_from_slice(&block);
    block.as_mut_slice().zeroize();
    out
}

/// ECDH followed by HSalsa20 with a zero block: the lock's long-term key
#[must_use]
pub fn derive_shared_secret(ours: &X25519KeyPair, theirs: &X25519PublicKey) -> SharedSecret {
    let dh = ours.diffie_hellman(theirs);
    SharedSecret::new(hsalsa20(dh.as_bytes(), &[0u8; 16]))
}
