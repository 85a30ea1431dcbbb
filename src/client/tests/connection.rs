use std::sync::Arc;
use std::time::Duration;

use super::super::*;
use crate::protocol::ProtocolError;
use crate::protocol::error::DeviceErrorKind;
use crate::protocol::states::{LockAction, LockState};
use crate::testing::{LockSimulator, LockSimulatorConfig, SimulatedLock};
use crate::types::{AppType, LockCredential, SharedSecret};

fn identity() -> ClientIdentity {
    ClientIdentity::new(4242, AppType::App, "connection test")
}

fn credential() -> LockCredential {
    LockCredential {
        lock_uuid: LockSimulatorConfig::default().lock_uuid,
        authorization_id: 3,
        shared_secret: SharedSecret::new([0x24; 32]),
    }
}

fn paired_lock() -> SimulatedLock {
    SimulatedLock::from_simulator(
        LockSimulator::new(LockSimulatorConfig::default()).paired_with(credential()),
    )
}

#[tokio::test]
async fn test_unlock_then_read_state() {
    let lock = paired_lock();
    let connection = LockConnection::new(lock.clone(), NukiConfig::default());

    connection.unlock(&credential(), &identity()).await.unwrap();
    let states = connection.get_state(&credential(), &identity()).await.unwrap();

    assert_eq!(states.lock_state, LockState::Unlocked);
    assert_eq!(states.last_lock_action, LockAction::Unlock);
    assert_eq!(lock.with_simulator(|s| s.actions().to_vec()), [LockAction::Unlock]);
    assert!(!lock.is_subscribed(Characteristic::UserSpecificDataIo));
    assert!(!connection.is_busy());
}

#[tokio::test]
async fn test_lock_and_unlatch() {
    let lock = paired_lock();
    let connection = LockConnection::new(lock.clone(), NukiConfig::default());

    connection.unlatch(&credential(), &identity()).await.unwrap();
    connection.lock(&credential(), &identity()).await.unwrap();
    connection
        .lock_action(LockAction::LockNGo, &credential(), &identity())
        .await
        .unwrap();

    assert_eq!(
        lock.with_simulator(|s| s.actions().to_vec()),
        [LockAction::Unlatch, LockAction::Lock, LockAction::LockNGo]
    );
    // challenge request and command per action
    assert_eq!(lock.write_count(Characteristic::UserSpecificDataIo), 6);
}

#[tokio::test]
async fn test_unknown_action_is_not_sent() {
    let lock = paired_lock();
    let connection = LockConnection::new(lock.clone(), NukiConfig::default());

    let err = connection
        .lock_action(LockAction::Unknown(0x42), &credential(), &identity())
        .await
        .unwrap_err();
    assert!(matches!(err, NukiError::InvalidParameter { name: "action", .. }));
    assert_eq!(lock.write_count(Characteristic::UserSpecificDataIo), 0);
}

#[tokio::test]
async fn test_unknown_credential_is_rejected_by_lock() {
    let lock = paired_lock();
    let connection = LockConnection::new(lock, NukiConfig::default());
    let stranger = LockCredential {
        shared_secret: SharedSecret::new([0x99; 32]),
        ..credential()
    };

    let err = connection.unlock(&stranger, &identity()).await.unwrap_err();
    match err {
        NukiError::Protocol(ProtocolError::Device(e)) => {
            assert_eq!(e.kind, DeviceErrorKind::Unknown);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_second_command_rejected_while_busy() {
    let lock = paired_lock().silent();
    let connection = Arc::new(LockConnection::new(lock.clone(), NukiConfig::default()));

    let first = {
        let connection = Arc::clone(&connection);
        tokio::spawn(async move { connection.lock(&credential(), &identity()).await })
    };
    while lock.write_count(Characteristic::UserSpecificDataIo) == 0 {
        tokio::task::yield_now().await;
    }
    assert!(connection.is_busy());

    let err = connection.unlock(&credential(), &identity()).await.unwrap_err();
    assert!(matches!(err, NukiError::CommandInProgress));
    assert!(err.is_recoverable());
    assert_eq!(lock.write_count(Characteristic::UserSpecificDataIo), 1);

    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());
    assert!(!connection.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_command_times_out() {
    let lock = paired_lock().silent();
    let config = NukiConfig::builder()
        .command_timeout(Duration::from_secs(30))
        .build();
    let connection = LockConnection::new(lock.clone(), config);

    let start = tokio::time::Instant::now();
    let err = connection.get_state(&credential(), &identity()).await.unwrap_err();

    match err {
        NukiError::Timeout { operation, duration } => {
            assert_eq!(operation, "get_state");
            assert_eq!(duration, Duration::from_secs(30));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(start.elapsed(), Duration::from_secs(30));
    assert!(!connection.is_busy());
    assert!(!lock.is_subscribed(Characteristic::UserSpecificDataIo));
}

#[tokio::test]
async fn test_disconnect_closes_link() {
    let lock = paired_lock();
    let connection = LockConnection::new(lock.clone(), NukiConfig::default());
    connection.disconnect().await.unwrap();

    let mut link = lock;
    assert!(matches!(
        link.write(Characteristic::UserSpecificDataIo, &[0]).await,
        Err(TransportError::Disconnected)
    ));
}
