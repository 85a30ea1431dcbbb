use std::time::Duration;

use super::*;

// --- config.rs tests ---

#[test]
fn test_config_defaults() {
    let config = NukiConfig::default();

    assert_eq!(config.pairing_timeout, Duration::from_secs(60));
    assert_eq!(config.command_timeout, Duration::from_secs(30));
    assert!(config.bridge_read_delay.is_none());
    assert_eq!(config.max_frame_len, 1024);
}

#[test]
fn test_config_builder() {
    let config = NukiConfig::builder()
        .pairing_timeout(Duration::from_secs(90))
        .command_timeout(Duration::from_secs(10))
        .bridge_read_delay(Duration::from_secs(3))
        .max_frame_len(256)
        .build();

    assert_eq!(config.pairing_timeout, Duration::from_secs(90));
    assert_eq!(config.command_timeout, Duration::from_secs(10));
    assert_eq!(config.bridge_read_delay, Some(Duration::from_secs(3)));
    assert_eq!(config.max_frame_len, 256);
}

// --- identity.rs tests ---

#[test]
fn test_padded_name_pads_with_spaces() {
    let identity = ClientIdentity::new(1, AppType::Fob, "Front door");
    let padded = identity.padded_name();

    assert_eq!(&padded[..10], b"Front door");
    assert!(padded[10..].iter().all(|b| *b == b' '));
}

#[test]
fn test_padded_name_truncates_on_char_boundary() {
    // 31 ASCII bytes followed by a two-byte character
    let name = format!("{}é", "a".repeat(31));
    let identity = ClientIdentity::new(1, AppType::Fob, name);
    let padded = identity.padded_name();

    assert_eq!(&padded[..31], "a".repeat(31).as_bytes());
    assert_eq!(padded[31], b' ');
}

#[test]
fn test_generated_identity_is_fob() {
    let identity = ClientIdentity::generate("HB NFC Key");
    assert_eq!(identity.app_type, AppType::Fob);
    assert_eq!(identity.name, format!("HB NFC Key {}", identity.app_id));
}

#[test]
fn test_app_type_roundtrip() {
    for raw in 0..=5u8 {
        assert_eq!(u8::from(AppType::from(raw)), raw);
    }
    assert_eq!(AppType::from(2), AppType::Fob);
}

// --- credential.rs tests ---

#[test]
fn test_credential_serializes_like_config_file() {
    let credential = LockCredential {
        lock_uuid: uuid::Uuid::from_bytes([0xAB; 16]),
        authorization_id: 7,
        shared_secret: SharedSecret::new([0x01; 32]),
    };

    let json = serde_json::to_value(&credential).unwrap();
    assert_eq!(json["nukiUuid"], "abababababababababababababababab");
    assert_eq!(json["nukiAuthorizationId"], 7);
    assert_eq!(json["sharedSecret"], "01".repeat(32));

    let back: LockCredential = serde_json::from_value(json).unwrap();
    assert_eq!(back, credential);
}

#[test]
fn test_shared_secret_debug_is_redacted() {
    let secret = SharedSecret::new([0x55; 32]);
    assert_eq!(format!("{secret:?}"), "SharedSecret(..)");
}

#[test]
fn test_shared_secret_from_bad_hex() {
    assert!(SharedSecret::from_hex("zz").is_err());
    assert!(SharedSecret::from_hex(&"00".repeat(31)).is_err());
}
