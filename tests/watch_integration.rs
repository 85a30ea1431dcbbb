//! Advertisement driven state reads

mod common;

use std::time::Duration;

use nukible::protocol::constants::gatt;
use nukible::testing::{LockSimulatorConfig, SimulatedCentral, SimulatedLock};
use nukible::transport::{Central, Peripheral, TransportError};
use nukible::{LockState, NukiClient, NukiConfig, NukiError, PairedLock};

fn beacon(id: &str, status: u8) -> Peripheral {
    let mut data = vec![0x4C, 0x00, 0x02, 0x15];
    data.extend_from_slice(gatt::KEYTURNER_SERVICE.as_bytes());
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, status]);
    Peripheral::new(id, "Nuki_1").with_manufacturer_data(data)
}

fn paired(id: &str) -> PairedLock {
    PairedLock {
        peripheral_id: id.to_string(),
        credential: common::credential(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_reads_state_on_each_rising_edge() {
    common::init_logging();
    let lock = common::paired_lock(LockSimulatorConfig {
        lock_state: LockState::Unlatched,
        ..LockSimulatorConfig::default()
    });
    let mut central = SimulatedCentral::new().with_lock("lock", lock.clone());
    let client = NukiClient::new(
        NukiConfig::builder()
            .bridge_read_delay(Duration::from_secs(5))
            .build(),
    );

    let advertisements = futures::stream::iter(vec![
        beacon("lock", 0x00),
        beacon("lock", 0x01),
        beacon("lock", 0x01),
        beacon("other", 0x01),
        Peripheral::new("lock", "Nuki_1"),
        beacon("lock", 0x00),
        beacon("lock", 0x81),
    ]);

    let mut seen = Vec::new();
    let start = tokio::time::Instant::now();
    client
        .watch_state_changes(
            &mut central,
            advertisements,
            &paired("lock"),
            &common::identity(),
            |states| seen.push(states.lock_state),
        )
        .await
        .unwrap();

    assert_eq!(seen, [LockState::Unlatched, LockState::Unlatched]);
    assert_eq!(lock.connections(), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test]
async fn test_failed_reads_do_not_end_the_watch() {
    common::init_logging();
    // the lock does not know this client, so every read fails
    let lock = SimulatedLock::new(LockSimulatorConfig::default());
    let mut central = SimulatedCentral::new().with_lock("lock", lock.clone());

    let mut calls = 0;
    NukiClient::default()
        .watch_state_changes(
            &mut central,
            futures::stream::iter(vec![
                beacon("lock", 0x01),
                beacon("lock", 0x00),
                beacon("lock", 0x01),
            ]),
            &paired("lock"),
            &common::identity(),
            |_| calls += 1,
        )
        .await
        .unwrap();

    assert_eq!(calls, 0);
    assert_eq!(lock.connections(), 2);
}

#[tokio::test]
async fn test_unreachable_lock_is_logged_and_skipped() {
    common::init_logging();
    let mut central = SimulatedCentral::new();

    let result: Result<(), NukiError> = NukiClient::default()
        .watch_state_changes(
            &mut central,
            futures::stream::iter(vec![beacon("lock", 0x01)]),
            &paired("lock"),
            &common::identity(),
            |_| panic!("no state expected"),
        )
        .await;
    assert!(result.is_ok());
}

/// Refuses the first `refusals` connects, then behaves like `inner`
struct RefusingCentral {
    inner: SimulatedCentral,
    refusals: usize,
}

#[async_trait::async_trait]
impl Central for RefusingCentral {
    type Link = SimulatedLock;

    async fn connect(&mut self, peripheral: &Peripheral) -> Result<SimulatedLock, TransportError> {
        if self.refusals > 0 {
            self.refusals -= 1;
            return Err(TransportError::ConnectFailed {
                peripheral_id: peripheral.id.clone(),
                message: "out of range".to_string(),
            });
        }
        self.inner.connect(peripheral).await
    }
}

#[tokio::test]
async fn test_failed_read_is_retried_while_flag_stays_set() {
    common::init_logging();
    let lock = common::paired_lock(LockSimulatorConfig::default());
    let mut central = RefusingCentral {
        inner: SimulatedCentral::new().with_lock("lock", lock.clone()),
        refusals: 1,
    };

    let mut seen = Vec::new();
    NukiClient::default()
        .watch_state_changes(
            &mut central,
            futures::stream::iter(vec![
                beacon("lock", 0x01),
                beacon("lock", 0x01),
                beacon("lock", 0x01),
            ]),
            &paired("lock"),
            &common::identity(),
            |states| seen.push(states.lock_state),
        )
        .await
        .unwrap();

    // first connect refused, second read succeeds, third advertisement is the same change
    assert_eq!(seen, [LockSimulatorConfig::default().lock_state]);
    assert_eq!(lock.connections(), 1);
}
