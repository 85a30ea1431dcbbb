//! Driving a [`PairingSession`] over a transport

use rand::{CryptoRng, RngCore};

use super::{Deadline, require_characteristic};
use crate::error::NukiError;
use crate::protocol::pairing::{PairingSession, PairingStep};
use crate::transport::{Characteristic, LockTransport};
use crate::types::LockCredential;

/// Result of pairing with one lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    /// Pairing succeeded
    Paired(LockCredential),
    /// The lock is not in pairing mode
    NotInPairingMode,
}

/// Run a pairing session to completion on the pairing characteristic
///
/// No deadline is applied; [`NukiClient::pair_peripheral`](super::NukiClient::pair_peripheral)
/// is the bounded form. Notifications are unsubscribed again whatever the
/// result.
///
/// # Errors
///
/// Returns error if the transport fails or the session reports a protocol error
pub async fn run_pairing<T, R>(
    transport: &mut T,
    session: PairingSession<R>,
) -> Result<PairingOutcome, NukiError>
where
    T: LockTransport + ?Sized,
    R: RngCore + CryptoRng + Send,
{
    run_pairing_within(transport, session, None).await
}

/// Like [`run_pairing`], giving up on the exchange at `deadline`
///
/// Only the exchange is cut short, so the unsubscribe still runs on expiry.
pub(super) async fn run_pairing_within<T, R>(
    transport: &mut T,
    mut session: PairingSession<R>,
    deadline: Option<Deadline>,
) -> Result<PairingOutcome, NukiError>
where
    T: LockTransport + ?Sized,
    R: RngCore + CryptoRng + Send,
{
    let characteristic = Characteristic::PairingGeneralDataIo;
    require_characteristic(transport, characteristic).await?;

    transport.subscribe(characteristic).await?;
    let result = match deadline {
        Some(deadline) => deadline
            .run(exchange(transport, &mut session))
            .await
            .and_then(|outcome| outcome),
        None => exchange(transport, &mut session).await,
    };
    if let Err(e) = transport.unsubscribe(characteristic).await {
        tracing::debug!("Unsubscribe after pairing failed: {e}");
    }
    result
}

async fn exchange<T, R>(
    transport: &mut T,
    session: &mut PairingSession<R>,
) -> Result<PairingOutcome, NukiError>
where
    T: LockTransport + ?Sized,
    R: RngCore + CryptoRng + Send,
{
    let characteristic = Characteristic::PairingGeneralDataIo;
    let request = session.start()?;
    transport.write(characteristic, &request).await?;

    loop {
        let chunk = transport.next_notification(characteristic).await?;
        match session.feed(&chunk)? {
            PairingStep::Send(frame) => transport.write(characteristic, &frame).await?,
            PairingStep::NeedData => {}
            PairingStep::Complete(credential) => return Ok(PairingOutcome::Paired(credential)),
            PairingStep::NotInPairingMode => return Ok(PairingOutcome::NotInPairingMode),
        }
    }
}
