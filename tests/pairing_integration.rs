//! Pairing through the public API against simulated locks

mod common;

use std::collections::HashSet;

use nukible::testing::{LockSimulatorConfig, SimulatedCentral, SimulatedLock};
use nukible::transport::{Characteristic, LockTransport, Peripheral, TransportError};
use nukible::{ClientIdentity, LockState, NukiClient, NukiConfig, NukiError, PairingOutcome};

#[tokio::test]
async fn test_pair_then_unlock() {
    common::init_logging();
    let lock = SimulatedLock::new(LockSimulatorConfig::default());
    let mut central = SimulatedCentral::new().with_lock("AA:BB", lock.clone());
    let client = NukiClient::new(NukiConfig::default());
    let identity = ClientIdentity::generate("nukible");

    let paired = client
        .pair(
            &mut central,
            futures::stream::iter(vec![Peripheral::new("AA:BB", "Nuki_0A1B2C3D")]),
            &identity,
            &HashSet::new(),
        )
        .await
        .unwrap();
    assert_eq!(paired.peripheral_id, "AA:BB");
    assert_eq!(lock.with_simulator(|s| s.enrolled_app_id()), Some(identity.app_id));

    let connection = client
        .connect(&mut central, &Peripheral::new("AA:BB", "Nuki_0A1B2C3D"))
        .await
        .unwrap();
    connection.unlock(&paired.credential, &identity).await.unwrap();
    let states = connection.get_state(&paired.credential, &identity).await.unwrap();
    connection.disconnect().await.unwrap();

    assert_eq!(states.lock_state, LockState::Unlocked);
    assert_eq!(lock.connections(), 2);
}

#[tokio::test]
async fn test_pairing_survives_small_notifications() {
    common::init_logging();
    let mut lock =
        SimulatedLock::new(LockSimulatorConfig::default()).with_notification_mtu(7);

    let outcome = NukiClient::default()
        .pair_peripheral(&mut lock, &common::identity())
        .await
        .unwrap();
    assert!(matches!(outcome, PairingOutcome::Paired(_)));
}

#[tokio::test]
async fn test_pairing_requires_pairing_characteristic() {
    common::init_logging();
    struct NoPairing(SimulatedLock);

    #[async_trait::async_trait]
    impl LockTransport for NoPairing {
        async fn discover_characteristics(
            &mut self,
        ) -> Result<Vec<uuid::Uuid>, TransportError> {
            Ok(vec![Characteristic::UserSpecificDataIo.uuid()])
        }
        async fn subscribe(
            &mut self,
            c: Characteristic,
        ) -> Result<(), TransportError> {
            self.0.subscribe(c).await
        }
        async fn unsubscribe(
            &mut self,
            c: Characteristic,
        ) -> Result<(), TransportError> {
            self.0.unsubscribe(c).await
        }
        async fn write(
            &mut self,
            c: Characteristic,
            data: &[u8],
        ) -> Result<(), TransportError> {
            self.0.write(c, data).await
        }
        async fn next_notification(
            &mut self,
            c: Characteristic,
        ) -> Result<Vec<u8>, TransportError> {
            self.0.next_notification(c).await
        }
        async fn disconnect(&mut self) -> Result<(), TransportError> {
            self.0.disconnect().await
        }
    }

    let lock = SimulatedLock::new(LockSimulatorConfig::default());
    let mut transport = NoPairing(lock.clone());
    let err = NukiClient::default()
        .pair_peripheral(&mut transport, &common::identity())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NukiError::Transport(TransportError::CharacteristicMissing(_))
    ));
    assert_eq!(lock.write_count(Characteristic::PairingGeneralDataIo), 0);
}

#[tokio::test]
async fn test_pair_moves_past_locks_not_in_pairing_mode() {
    common::init_logging();
    let busy = SimulatedLock::new(LockSimulatorConfig {
        pairing_mode: false,
        ..LockSimulatorConfig::default()
    });
    let ready = SimulatedLock::new(LockSimulatorConfig {
        authorization_id: 0x11,
        ..LockSimulatorConfig::default()
    });
    let mut central = SimulatedCentral::new()
        .with_lock("busy", busy.clone())
        .with_lock("ready", ready);

    let paired = NukiClient::default()
        .pair(
            &mut central,
            futures::stream::iter(vec![
                Peripheral::new("busy", "Nuki_1"),
                Peripheral::new("ready", "Nuki_2"),
            ]),
            &common::identity(),
            &HashSet::new(),
        )
        .await
        .unwrap();

    assert_eq!(paired.peripheral_id, "ready");
    assert_eq!(paired.credential.authorization_id, 0x11);
    assert!(busy.with_simulator(|s| s.credential().is_none()));
    assert!(!busy.is_subscribed(Characteristic::PairingGeneralDataIo));
}
