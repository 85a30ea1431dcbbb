use proptest::prelude::*;

use super::super::*;
use crate::types::SharedSecret;

#[test]
fn test_seal_prepends_tag() {
    let cipher = SecretBox::new(&SharedSecret::new([0x42; 32]));
    let sealed = cipher.seal(&[1; 24], b"lock it").unwrap();
    assert_eq!(sealed.len(), lengths::SECRETBOX_TAG + 7);
}

#[test]
fn test_open_rejects_wrong_key() {
    let sealed = SecretBox::new(&SharedSecret::new([1; 32]))
        .seal(&[3; 24], b"payload")
        .unwrap();
    let result = SecretBox::new(&SharedSecret::new([2; 32])).open(&[3; 24], &sealed);
    assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
}

#[test]
fn test_open_rejects_wrong_nonce() {
    let cipher = SecretBox::new(&SharedSecret::new([1; 32]));
    let sealed = cipher.seal(&[3; 24], b"payload").unwrap();
    assert!(cipher.open(&[4; 24], &sealed).is_err());
}

#[test]
fn test_open_rejects_short_input() {
    let cipher = SecretBox::new(&SharedSecret::new([1; 32]));
    assert!(matches!(
        cipher.open(&[0; 24], &[0; 15]),
        Err(CryptoError::CiphertextTooShort { len: 15 })
    ));
}

proptest! {
    #[test]
    fn test_seal_open_roundtrip(
        key in any::<[u8; 32]>(),
        nonce in any::<[u8; 24]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let cipher = SecretBox::new(&SharedSecret::new(key));
        let sealed = cipher.seal(&nonce, &plaintext).unwrap();
        prop_assert_eq!(cipher.open(&nonce, &sealed).unwrap(), plaintext);
    }

    #[test]
    fn test_tampered_ciphertext_fails(
        plaintext in proptest::collection::vec(any::<u8>(), 1..128),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let cipher = SecretBox::new(&SharedSecret::new([9; 32]));
        let mut sealed = cipher.seal(&[5; 24], &plaintext).unwrap();
        let i = index.index(sealed.len());
        sealed[i] ^= 1 << bit;
        prop_assert!(cipher.open(&[5; 24], &sealed).is_err());
    }
}
