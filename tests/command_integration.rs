//! Encrypted commands through the public API

mod common;

use std::time::Duration;

use nukible::protocol::ProtocolError;
use nukible::testing::{LockSimulatorConfig, ScriptedTransport};
use nukible::transport::Characteristic;
use nukible::{LockAction, LockConnection, LockState, NukiConfig, NukiError};

#[tokio::test]
async fn test_lock_cycle() {
    common::init_logging();
    let lock = common::paired_lock(LockSimulatorConfig {
        lock_state: LockState::Unlocked,
        ..LockSimulatorConfig::default()
    });
    let connection = LockConnection::new(lock.clone(), NukiConfig::default());
    let (credential, identity) = (common::credential(), common::identity());

    let before = connection.get_state(&credential, &identity).await.unwrap();
    assert_eq!(before.lock_state_str(), "unlocked");

    connection.lock(&credential, &identity).await.unwrap();
    let after = connection.get_state(&credential, &identity).await.unwrap();
    assert_eq!(after.lock_state, LockState::Locked);
    assert_eq!(after.last_lock_action, LockAction::Lock);
    assert_eq!(after.battery_critical_str(), "ok");
}

#[tokio::test(start_paused = true)]
async fn test_silent_lock_times_out_and_connection_recovers() {
    common::init_logging();
    let transport = ScriptedTransport::new();
    let log = transport.write_log();
    let config = NukiConfig::builder()
        .command_timeout(Duration::from_secs(2))
        .build();
    let connection = LockConnection::new(transport, config);

    for _ in 0..2 {
        let err = connection
            .unlock(&common::credential(), &common::identity())
            .await
            .unwrap_err();
        assert!(matches!(err, NukiError::Timeout { .. }));
        assert!(err.is_recoverable());
    }
    assert_eq!(log.len(), 2);
    assert!(
        log.writes()
            .iter()
            .all(|(c, _)| *c == Characteristic::UserSpecificDataIo)
    );
}

#[tokio::test]
async fn test_lock_rejects_stale_credential() {
    common::init_logging();
    let lock = common::paired_lock(LockSimulatorConfig::default());
    let connection = LockConnection::new(lock, NukiConfig::default());
    let mut stale = common::credential();
    stale.authorization_id = 99;

    let err = connection
        .get_state(&stale, &common::identity())
        .await
        .unwrap_err();
    assert!(matches!(err, NukiError::Protocol(ProtocolError::Device(_))));
}
