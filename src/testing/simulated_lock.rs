//! In-process lock reachable through [`LockTransport`]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use super::lock_simulator::{LockSimulator, LockSimulatorConfig};
use crate::protocol::constants::sizes;
use crate::transport::{Central, Characteristic, LockTransport, Peripheral, TransportError};

struct Shared {
    simulator: LockSimulator,
    subscribed: HashSet<Characteristic>,
    notifications: HashMap<Characteristic, VecDeque<Vec<u8>>>,
    writes: Vec<(Characteristic, Vec<u8>)>,
    silent: bool,
    connected: bool,
    connections: usize,
}

/// A simulated lock behind a fake GATT link
///
/// Replies are split into notification fragments of at most
/// `notification_mtu` bytes. Clones share the same lock, so a test can keep a
/// handle for inspection after handing one to the client.
#[derive(Clone)]
pub struct SimulatedLock {
    shared: Arc<Mutex<Shared>>,
    notify: Arc<Notify>,
    notification_mtu: usize,
}

impl SimulatedLock {
    /// Create a lock with the given behaviour
    #[must_use]
    pub fn new(config: LockSimulatorConfig) -> Self {
        Self::from_simulator(LockSimulator::new(config))
    }

    /// Wrap an existing simulator
    #[must_use]
    pub fn from_simulator(simulator: LockSimulator) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                simulator,
                subscribed: HashSet::new(),
                notifications: HashMap::new(),
                writes: Vec::new(),
                silent: false,
                connected: true,
                connections: 0,
            })),
            notify: Arc::new(Notify::new()),
            notification_mtu: sizes::NOTIFICATION_MTU,
        }
    }

    /// Split replies into fragments of at most `mtu` bytes
    #[must_use]
    pub fn with_notification_mtu(mut self, mtu: usize) -> Self {
        self.notification_mtu = mtu.max(1);
        self
    }

    /// Never answer any write
    #[must_use]
    pub fn silent(self) -> Self {
        self.state().silent = true;
        self
    }

    /// Inspect the simulator
    pub fn with_simulator<T>(&self, f: impl FnOnce(&LockSimulator) -> T) -> T {
        f(&self.state().simulator)
    }

    /// Number of writes received on `characteristic`
    #[must_use]
    pub fn write_count(&self, characteristic: Characteristic) -> usize {
        self.state()
            .writes
            .iter()
            .filter(|(c, _)| *c == characteristic)
            .count()
    }

    /// Whether notifications are enabled on `characteristic`
    #[must_use]
    pub fn is_subscribed(&self, characteristic: Characteristic) -> bool {
        self.state().subscribed.contains(&characteristic)
    }

    /// Whether the link is up
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// How many times a central connected to this lock
    #[must_use]
    pub fn connections(&self) -> usize {
        self.state().connections
    }

    fn state(&self) -> MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn mark_connected(&self) {
        let mut state = self.state();
        state.connected = true;
        state.connections += 1;
        state.notifications.clear();
    }
}

#[async_trait]
impl LockTransport for SimulatedLock {
    async fn discover_characteristics(&mut self) -> Result<Vec<Uuid>, TransportError> {
        Ok(vec![
            Characteristic::PairingGeneralDataIo.uuid(),
            Characteristic::ServiceGeneralDataIo.uuid(),
            Characteristic::UserSpecificDataIo.uuid(),
        ])
    }

    async fn subscribe(&mut self, characteristic: Characteristic) -> Result<(), TransportError> {
        self.state().subscribed.insert(characteristic);
        Ok(())
    }

    async fn unsubscribe(&mut self, characteristic: Characteristic) -> Result<(), TransportError> {
        let mut state = self.state();
        state.subscribed.remove(&characteristic);
        state.notifications.remove(&characteristic);
        Ok(())
    }

    async fn write(
        &mut self,
        characteristic: Characteristic,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        state.writes.push((characteristic, data.to_vec()));
        if state.silent {
            return Ok(());
        }

        let replies = match characteristic {
            Characteristic::PairingGeneralDataIo => state.simulator.handle_pairing(data),
            Characteristic::UserSpecificDataIo => state.simulator.handle_command(data),
            Characteristic::ServiceGeneralDataIo => Vec::new(),
        };
        let mtu = self.notification_mtu;
        let queue = state.notifications.entry(characteristic).or_default();
        for reply in replies {
            queue.extend(reply.chunks(mtu).map(<[u8]>::to_vec));
        }
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn next_notification(
        &mut self,
        characteristic: Characteristic,
    ) -> Result<Vec<u8>, TransportError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state();
                if !state.connected {
                    return Err(TransportError::Disconnected);
                }
                if !state.subscribed.contains(&characteristic) {
                    return Err(TransportError::SubscribeFailed {
                        characteristic,
                        message: "not subscribed".to_string(),
                    });
                }
                if let Some(chunk) = state
                    .notifications
                    .get_mut(&characteristic)
                    .and_then(VecDeque::pop_front)
                {
                    return Ok(chunk);
                }
            }
            notified.await;
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.connected = false;
        state.subscribed.clear();
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Central that connects to a fixed set of simulated locks
#[derive(Clone, Default)]
pub struct SimulatedCentral {
    locks: HashMap<String, SimulatedLock>,
}

impl SimulatedCentral {
    /// Create a central with no locks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `lock` reachable as `peripheral_id`
    #[must_use]
    pub fn with_lock(mut self, peripheral_id: impl Into<String>, lock: SimulatedLock) -> Self {
        self.locks.insert(peripheral_id.into(), lock);
        self
    }
}

#[async_trait]
impl Central for SimulatedCentral {
    type Link = SimulatedLock;

    async fn connect(&mut self, peripheral: &Peripheral) -> Result<SimulatedLock, TransportError> {
        let lock = self
            .locks
            .get(&peripheral.id)
            .cloned()
            .ok_or_else(|| TransportError::ConnectFailed {
                peripheral_id: peripheral.id.clone(),
                message: "no such peripheral".to_string(),
            })?;
        lock.mark_connected();
        Ok(lock)
    }
}
