//! Async drivers for pairing and lock commands

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::Instant;

use crate::error::NukiError;
use crate::protocol::pairing::PairingSession;
use crate::transport::{Central, Characteristic, LockTransport, Peripheral, TransportError};
use crate::types::{ClientIdentity, NukiConfig, PairedLock};

mod connection;
mod pairing;

#[cfg(test)]
mod tests;

pub use connection::LockConnection;
pub use pairing::{PairingOutcome, run_pairing};

use pairing::run_pairing_within;

/// Nuki lock client
///
/// # Example
///
/// ```rust,no_run
/// use std::collections::HashSet;
///
/// use nukible::testing::{LockSimulatorConfig, SimulatedCentral, SimulatedLock};
/// use nukible::transport::Peripheral;
/// use nukible::{ClientIdentity, NukiClient, NukiConfig};
///
/// # async fn example() -> Result<(), nukible::NukiError> {
/// let client = NukiClient::new(NukiConfig::default());
/// let identity = ClientIdentity::generate("nukible");
///
/// let mut central = SimulatedCentral::new()
///     .with_lock("lock-1", SimulatedLock::new(LockSimulatorConfig::default()));
/// let discoveries = futures::stream::iter(vec![Peripheral::new("lock-1", "Nuki_1A2B3C4D")]);
///
/// // Pair with the first lock in pairing mode
/// let paired = client
///     .pair(&mut central, discoveries, &identity, &HashSet::new())
///     .await?;
///
/// // Unlock it
/// let connection = client
///     .connect(&mut central, &Peripheral::new("lock-1", "Nuki_1A2B3C4D"))
///     .await?;
/// connection.unlock(&paired.credential, &identity).await?;
/// connection.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct NukiClient {
    config: NukiConfig,
}

impl NukiClient {
    /// Create a client
    #[must_use]
    pub fn new(config: NukiConfig) -> Self {
        Self { config }
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &NukiConfig {
        &self.config
    }

    /// Pair with the first discovered lock that is in pairing mode
    ///
    /// Peripherals in `already_paired`, without a local name, not connectable
    /// or already tried are skipped. Locks are tried one at a time; a lock
    /// that is not in pairing mode or fails with an ordinary error is
    /// disconnected and the next one is tried. Authentication failures end
    /// pairing immediately.
    ///
    /// # Errors
    ///
    /// Returns [`NukiError::Timeout`] after `pairing_timeout`,
    /// [`NukiError::NoPairableLock`] if discovery ends first, or a
    /// security-relevant protocol error.
    pub async fn pair<C, S>(
        &self,
        central: &mut C,
        discoveries: S,
        identity: &ClientIdentity,
        already_paired: &HashSet<String>,
    ) -> Result<PairedLock, NukiError>
    where
        C: Central,
        S: Stream<Item = Peripheral> + Send,
    {
        let deadline = Deadline::after(self.config.pairing_timeout, "pair");
        Self::pair_first(central, discoveries, identity, already_paired, deadline).await
    }

    async fn pair_first<C, S>(
        central: &mut C,
        discoveries: S,
        identity: &ClientIdentity,
        already_paired: &HashSet<String>,
        deadline: Deadline,
    ) -> Result<PairedLock, NukiError>
    where
        C: Central,
        S: Stream<Item = Peripheral> + Send,
    {
        let mut discoveries = std::pin::pin!(discoveries);
        let mut tried = HashSet::new();

        while let Some(peripheral) = deadline.run(discoveries.next()).await? {
            if already_paired.contains(&peripheral.id)
                || peripheral.local_name.is_none()
                || !peripheral.connectable
                || !tried.insert(peripheral.id.clone())
            {
                tracing::trace!(id = %peripheral.id, "Skipping peripheral");
                continue;
            }

            tracing::info!(id = %peripheral.id, name = ?peripheral.local_name, "Trying to pair");
            let mut link = match deadline.run(central.connect(&peripheral)).await? {
                Ok(link) => link,
                Err(e) => {
                    tracing::warn!(id = %peripheral.id, "Connect failed: {e}");
                    continue;
                }
            };

            let session = PairingSession::new(identity.clone());
            let result = run_pairing_within(&mut link, session, Some(deadline)).await;
            if let Err(e) = link.disconnect().await {
                tracing::debug!(id = %peripheral.id, "Disconnect failed: {e}");
            }

            match result {
                Ok(PairingOutcome::Paired(credential)) => {
                    return Ok(PairedLock {
                        peripheral_id: peripheral.id,
                        credential,
                    });
                }
                Ok(PairingOutcome::NotInPairingMode) => {
                    tracing::info!(id = %peripheral.id, "Not in pairing mode, ignoring");
                }
                Err(e) if e.is_security_relevant() => return Err(e),
                Err(e @ NukiError::Timeout { .. }) => return Err(e),
                Err(e) => tracing::warn!(id = %peripheral.id, "Pairing failed: {e}"),
            }
        }

        Err(NukiError::NoPairableLock)
    }

    /// Pair over an already connected transport
    ///
    /// # Errors
    ///
    /// Returns [`NukiError::Timeout`] after `pairing_timeout`, or the
    /// transport or protocol error that ended the session.
    pub async fn pair_peripheral<T: LockTransport + ?Sized>(
        &self,
        transport: &mut T,
        identity: &ClientIdentity,
    ) -> Result<PairingOutcome, NukiError> {
        let deadline = Deadline::after(self.config.pairing_timeout, "pair");
        run_pairing_within(transport, PairingSession::new(identity.clone()), Some(deadline)).await
    }

    /// Connect to a paired lock for commands
    ///
    /// # Errors
    ///
    /// Returns error if connecting fails
    pub async fn connect<C: Central>(
        &self,
        central: &mut C,
        peripheral: &Peripheral,
    ) -> Result<LockConnection<C::Link>, NukiError> {
        let link = central.connect(peripheral).await?;
        tracing::debug!(id = %peripheral.id, "Connected");
        Ok(LockConnection::new(link, self.config.clone()))
    }
}

/// Absolute end of an operation, shared by every step it awaits
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Instant,
    duration: Duration,
    operation: &'static str,
}

impl Deadline {
    pub(crate) fn after(duration: Duration, operation: &'static str) -> Self {
        Self {
            at: Instant::now() + duration,
            duration,
            operation,
        }
    }

    /// Await `future` until the deadline; the future is dropped on expiry
    pub(crate) async fn run<F: Future>(self, future: F) -> Result<F::Output, NukiError> {
        tokio::time::timeout_at(self.at, future).await.map_err(|_| {
            tracing::warn!(operation = self.operation, duration = ?self.duration, "Timed out");
            NukiError::Timeout {
                operation: self.operation,
                duration: self.duration,
            }
        })
    }
}

/// Fail unless `characteristic` was discovered on the peripheral
async fn require_characteristic<T: LockTransport + ?Sized>(
    transport: &mut T,
    characteristic: Characteristic,
) -> Result<(), TransportError> {
    let uuid = characteristic.uuid();
    if transport.discover_characteristics().await?.contains(&uuid) {
        Ok(())
    } else {
        Err(TransportError::CharacteristicMissing(uuid))
    }
}
