//! Watching a paired lock for state changes
//!
//! A lock advertises an iBeacon carrying the keyturner service UUID. Bit 0 of
//! the last byte is set while a new state is waiting to be read, which is the
//! cue to connect and fetch it.

use futures::{Stream, StreamExt};

use crate::client::NukiClient;
use crate::error::NukiError;
use crate::protocol::constants::gatt;
use crate::protocol::states::NukiStates;
use crate::transport::{Central, Peripheral};
use crate::types::{ClientIdentity, PairedLock};

/// Offset of the service UUID in the manufacturer data
const UUID_OFFSET: usize = 4;
/// Offset of the status byte in the manufacturer data
const STATUS_OFFSET: usize = 24;

/// Status carried in a lock advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisedStatus {
    /// Raw status byte
    pub status: u8,
}

impl AdvertisedStatus {
    /// Whether the lock has a state change nobody has read yet
    #[must_use]
    pub fn new_state_available(self) -> bool {
        self.status & 0x01 != 0
    }
}

/// Extract the status from iBeacon manufacturer data
///
/// Returns `None` unless the data is long enough and carries the keyturner
/// service UUID.
#[must_use]
pub fn parse_advertisement(data: &[u8]) -> Option<AdvertisedStatus> {
    if data.len() <= STATUS_OFFSET {
        return None;
    }
    if data[UUID_OFFSET..UUID_OFFSET + 16] != gatt::KEYTURNER_SERVICE.as_bytes()[..] {
        return None;
    }
    Some(AdvertisedStatus {
        status: data[STATUS_OFFSET],
    })
}

/// Turns a stream of "new state available" flags into fetch triggers
#[derive(Debug, Clone, Default)]
pub struct StateChangeDetector {
    last: Option<bool>,
}

impl StateChangeDetector {
    /// Create a detector that has seen nothing yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation, returning whether a fetch should start
    ///
    /// Fires when the flag rises, and on the first observation if the flag is
    /// already set.
    pub fn observe(&mut self, new_state_available: bool) -> bool {
        let fire = new_state_available && self.last != Some(true);
        self.last = Some(new_state_available);
        fire
    }

    /// Forget the last observation, so a flag that is still set fires again
    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl NukiClient {
    /// Fetch the lock state whenever its advertisements announce a change
    ///
    /// `advertisements` yields scan results; those not from `lock` or without
    /// a lock status are ignored. Each trigger waits for `bridge_read_delay`
    /// if configured, connects, reads the state, hands it to `on_change` and
    /// disconnects. Failed reads are logged and watching goes on; the next
    /// advertisement still announcing the change retries the read.
    ///
    /// # Errors
    ///
    /// Returns a security-relevant error from a state read; otherwise returns
    /// `Ok` once `advertisements` ends.
    pub async fn watch_state_changes<C, S, F>(
        &self,
        central: &mut C,
        advertisements: S,
        lock: &PairedLock,
        identity: &ClientIdentity,
        mut on_change: F,
    ) -> Result<(), NukiError>
    where
        C: Central,
        S: Stream<Item = Peripheral> + Send,
        F: FnMut(NukiStates) + Send,
    {
        let mut advertisements = std::pin::pin!(advertisements);
        let mut detector = StateChangeDetector::new();

        while let Some(peripheral) = advertisements.next().await {
            if peripheral.id != lock.peripheral_id {
                continue;
            }
            let Some(status) = peripheral
                .manufacturer_data
                .as_deref()
                .and_then(parse_advertisement)
            else {
                continue;
            };
            tracing::trace!(id = %peripheral.id, status = status.status, "Lock advertisement");

            if !detector.observe(status.new_state_available()) {
                continue;
            }

            if let Some(delay) = self.config().bridge_read_delay {
                tracing::debug!(?delay, "Letting the bridge read first");
                tokio::time::sleep(delay).await;
            }

            match self.fetch_state(central, &peripheral, lock, identity).await {
                Ok(states) => {
                    tracing::info!(lock_state = states.lock_state_str(), "Lock state changed");
                    on_change(states);
                }
                Err(e) if e.is_security_relevant() => return Err(e),
                Err(e) => {
                    tracing::warn!(id = %peripheral.id, "Reading lock state failed: {e}");
                    detector.reset();
                }
            }
        }

        tracing::debug!("Advertisement stream ended");
        Ok(())
    }

    async fn fetch_state<C: Central>(
        &self,
        central: &mut C,
        peripheral: &Peripheral,
        lock: &PairedLock,
        identity: &ClientIdentity,
    ) -> Result<NukiStates, NukiError> {
        let connection = self.connect(central, peripheral).await?;
        let result = connection.get_state(&lock.credential, identity).await;
        if let Err(e) = connection.disconnect().await {
            tracing::debug!(id = %peripheral.id, "Disconnect failed: {e}");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon(status: u8) -> Vec<u8> {
        let mut data = vec![0x4C, 0x00, 0x02, 0x15];
        data.extend_from_slice(gatt::KEYTURNER_SERVICE.as_bytes());
        data.extend_from_slice(&[0x00, 0x01, 0x00, 0x02]);
        data.push(status);
        data
    }

    #[test]
    fn test_parse_advertisement() {
        let status = parse_advertisement(&beacon(0xC5)).unwrap();
        assert_eq!(status.status, 0xC5);
        assert!(status.new_state_available());
        assert!(!parse_advertisement(&beacon(0xC4)).unwrap().new_state_available());
    }

    #[test]
    fn test_parse_advertisement_rejects_other_beacons() {
        let mut data = beacon(0x01);
        data[4] ^= 0xFF;
        assert_eq!(parse_advertisement(&data), None);
        assert_eq!(parse_advertisement(&beacon(0x01)[..24]), None);
        assert_eq!(parse_advertisement(&[]), None);
    }

    #[test]
    fn test_detector_fires_on_rising_edge() {
        let mut detector = StateChangeDetector::new();
        let fired: Vec<bool> = [false, true, true, false, false, true]
            .into_iter()
            .map(|bit| detector.observe(bit))
            .collect();
        assert_eq!(fired, [false, true, false, false, false, true]);
    }

    #[test]
    fn test_detector_reset_rearms_a_set_flag() {
        let mut detector = StateChangeDetector::new();
        assert!(detector.observe(true));
        detector.reset();
        assert!(detector.observe(true));
        assert!(!detector.observe(true));
    }

    #[test]
    fn test_detector_fires_on_first_set_observation() {
        let mut detector = StateChangeDetector::new();
        assert!(detector.observe(true));
        assert!(!detector.observe(true));
    }
}
