use super::super::*;
use crate::protocol::constants::CommandId;
use crate::protocol::crypto::SecretBox;
use crate::protocol::error::ProtocolError;
use crate::types::SharedSecret;

#[test]
fn test_pairing_frame_lengths() {
    assert_eq!(pairing_frame_len(CommandId::PUBLIC_KEY), Some(36));
    assert_eq!(pairing_frame_len(CommandId::CHALLENGE), Some(36));
    assert_eq!(pairing_frame_len(CommandId::AUTHORIZATION_ID), Some(88));
    assert_eq!(pairing_frame_len(CommandId::STATUS), Some(5));
    assert_eq!(pairing_frame_len(CommandId::ERROR), Some(7));
    assert_eq!(pairing_frame_len(CommandId::LOCK_ACTION), None);
}

#[test]
fn test_pairing_assembler_joins_fragments() {
    let frame = encode_frame(CommandId::AUTHORIZATION_ID, &[9; 84]);
    let mut assembler = PairingFrameAssembler::new();

    let mut chunks = frame.chunks(20).peekable();
    while let Some(chunk) = chunks.next() {
        let result = assembler.push(chunk).unwrap();
        if chunks.peek().is_some() {
            assert!(result.is_none());
        } else {
            let frame = result.unwrap();
            assert_eq!(frame.command, CommandId::AUTHORIZATION_ID);
            assert_eq!(frame.payload.len(), 84);
        }
    }
    assert_eq!(assembler.buffered(), 0);
}

#[test]
fn test_pairing_assembler_waits_for_command_id() {
    let frame = encode_frame(CommandId::STATUS, &[0]);
    let mut assembler = PairingFrameAssembler::new();
    assert!(assembler.push(&frame[..1]).unwrap().is_none());
    assert!(assembler.push(&frame[1..]).unwrap().is_some());
}

#[test]
fn test_pairing_assembler_rejects_unknown_command() {
    let frame = encode_frame(CommandId::LOCK_ACTION, &[0; 8]);
    let err = PairingFrameAssembler::new().push(&frame).unwrap_err();
    assert!(matches!(
        err.into_protocol("AwaitChallenge"),
        ProtocolError::UnexpectedCommand {
            command: CommandId::LOCK_ACTION,
            ..
        }
    ));
}

#[test]
fn test_pairing_assembler_rejects_overlong() {
    let mut frame = encode_frame(CommandId::STATUS, &[0]);
    frame.push(0);
    assert!(matches!(
        PairingFrameAssembler::new().push(&frame),
        Err(FrameError::Overlong {
            expected: 5,
            actual: 6
        })
    ));
}

#[test]
fn test_pairing_assembler_bad_crc_maps_to_checksum() {
    let mut frame = encode_frame(CommandId::CHALLENGE, &[1; 32]);
    frame[10] ^= 0x01;
    let err = PairingFrameAssembler::new().push(&frame).unwrap_err();
    assert!(matches!(
        err.into_protocol("AwaitChallenge"),
        ProtocolError::Checksum { state } if state == "AwaitChallenge"
    ));
}

#[test]
fn test_encrypted_assembler_uses_declared_length() {
    let cipher = SecretBox::new(&SharedSecret::new([3; 32]));
    let bytes = encode_encrypted_frame_with_nonce(
        &cipher,
        &[8; 24],
        5,
        CommandId::NUKI_STATES,
        &[0; 18],
    )
    .unwrap();
    let mut assembler = EncryptedFrameAssembler::new(1024);

    let mut complete = None;
    for chunk in bytes.chunks(20) {
        assert!(complete.is_none());
        complete = assembler.push(chunk).unwrap();
    }
    match complete {
        Some(Incoming::Encrypted(frame)) => {
            assert_eq!(frame.authorization_id, 5);
            let decrypted = frame.open(&cipher).unwrap();
            assert_eq!(decrypted.frame.command, CommandId::NUKI_STATES);
        }
        other => panic!("expected encrypted frame, got {other:?}"),
    }
}

#[test]
fn test_encrypted_assembler_accepts_plain_error() {
    let frame = encode_frame(CommandId::ERROR, &[0x22, 0x0D, 0x00]);
    let mut assembler = EncryptedFrameAssembler::new(1024);
    match assembler.push(&frame).unwrap() {
        Some(Incoming::Plain(frame)) => assert_eq!(frame.command, CommandId::ERROR),
        other => panic!("expected plain frame, got {other:?}"),
    }
}

#[test]
fn test_encrypted_assembler_rejects_oversized_length() {
    let mut header = vec![0u8; 30];
    header[28..30].copy_from_slice(&2000u16.to_le_bytes());
    let mut assembler = EncryptedFrameAssembler::new(1024);
    assert!(assembler.push(&header[..20]).unwrap().is_none());
    assert!(matches!(
        assembler.push(&header[20..]),
        Err(FrameError::TooLarge {
            size: 2000,
            max: 1024
        })
    ));
}
