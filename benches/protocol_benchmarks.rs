use criterion::{Criterion, black_box, criterion_group, criterion_main};
use nukible::SharedSecret;
use nukible::protocol::constants::CommandId;
use nukible::protocol::crypto::{SecretBox, X25519KeyPair, derive_shared_secret};
use nukible::protocol::frame::{
    EncryptedFrame, EncryptedFrameAssembler, Frame, crc16_ccitt, encode_encrypted_frame_with_nonce,
    encode_frame,
};
use nukible::protocol::states::NukiStates;

fn frame_benchmark(c: &mut Criterion) {
    let payload = [0x5A; 84];
    let encoded = encode_frame(CommandId::AUTHORIZATION_ID, &payload);

    c.bench_function("crc16_ccitt_88_bytes", |b| {
        b.iter(|| crc16_ccitt(black_box(&encoded)))
    });

    c.bench_function("frame_decode_authorization_id", |b| {
        b.iter(|| Frame::decode(black_box(&encoded)).unwrap())
    });
}

fn encrypted_frame_benchmark(c: &mut Criterion) {
    let secretbox = SecretBox::new(&SharedSecret::new([0x42; 32]));
    let nonce = [0x07; 24];
    let mut states = vec![0u8; 18];
    states[0] = 2;
    states[1] = 1;

    c.bench_function("encrypted_frame_encode", |b| {
        b.iter(|| {
            encode_encrypted_frame_with_nonce(
                &secretbox,
                &nonce,
                3,
                CommandId::NUKI_STATES,
                black_box(&states),
            )
            .unwrap()
        })
    });

    let encrypted =
        encode_encrypted_frame_with_nonce(&secretbox, &nonce, 3, CommandId::NUKI_STATES, &states)
            .unwrap();
    c.bench_function("encrypted_frame_reassemble_open_decode", |b| {
        b.iter(|| {
            let mut assembler = EncryptedFrameAssembler::new(1024);
            let mut complete = None;
            for chunk in black_box(&encrypted).chunks(20) {
                complete = assembler.push(chunk).unwrap();
            }
            let Some(nukible::protocol::frame::Incoming::Encrypted(envelope)) = complete else {
                unreachable!("frame is complete");
            };
            let decrypted = envelope.open(&secretbox).unwrap();
            NukiStates::decode(&decrypted.frame.payload).unwrap()
        })
    });

    c.bench_function("encrypted_frame_parse", |b| {
        b.iter(|| EncryptedFrame::parse(black_box(&encrypted)).unwrap())
    });
}

fn kdf_benchmark(c: &mut Criterion) {
    let ours = X25519KeyPair::generate();
    let theirs = X25519KeyPair::generate().public_key();

    c.bench_function("derive_shared_secret", |b| {
        b.iter(|| derive_shared_secret(black_box(&ours), black_box(&theirs)))
    });
}

criterion_group!(
    benches,
    frame_benchmark,
    encrypted_frame_benchmark,
    kdf_benchmark
);
criterion_main!(benches);
