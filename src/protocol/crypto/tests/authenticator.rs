use super::super::*;
use crate::types::SharedSecret;

#[test]
fn test_authenticator_concatenates_parts() {
    let key = SharedSecret::new([0x0b; 32]);
    let joined = authenticator(&key, &[&b"what do ya want "[..], &b"for nothing?"[..]]).unwrap();
    let whole = authenticator(&key, &[&b"what do ya want for nothing?"[..]]).unwrap();
    assert_eq!(joined, whole);
}

#[test]
fn test_authenticator_depends_on_key() {
    let a = authenticator(&SharedSecret::new([1; 32]), &[&b"message"[..]]).unwrap();
    let b = authenticator(&SharedSecret::new([2; 32]), &[&b"message"[..]]).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_verify_authenticator() {
    let key = SharedSecret::new([7; 32]);
    let tag = authenticator(&key, &[&b"abc"[..], &b"def"[..]]).unwrap();

    assert!(verify_authenticator(&key, &[&b"abcdef"[..]], &tag).unwrap());

    let mut forged = tag;
    forged[31] ^= 0x01;
    assert!(!verify_authenticator(&key, &[&b"abcdef"[..]], &forged).unwrap());
    assert!(!verify_authenticator(&key, &[&b"abcdef"[..]], &tag[..16]).unwrap());
}
