//! Encrypted commands against a connected, paired lock

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use super::{Deadline, require_characteristic};
use crate::error::NukiError;
use crate::protocol::ProtocolError;
use crate::protocol::command::{CommandKind, CommandOutcome, CommandSession, CommandStep};
use crate::protocol::states::{LockAction, NukiStates};
use crate::transport::{Characteristic, LockTransport};
use crate::types::{ClientIdentity, LockCredential, NukiConfig};

/// Clears the busy flag when the command ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Connection to one lock
///
/// At most one command runs at a time. A second command issued while one is
/// outstanding fails with [`NukiError::CommandInProgress`] without touching
/// the transport.
pub struct LockConnection<T> {
    transport: Mutex<T>,
    busy: AtomicBool,
    config: NukiConfig,
}

impl<T: LockTransport> LockConnection<T> {
    /// Wrap a connected transport
    #[must_use]
    pub fn new(transport: T, config: NukiConfig) -> Self {
        Self {
            transport: Mutex::new(transport),
            busy: AtomicBool::new(false),
            config,
        }
    }

    /// Whether a command is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Lock the door
    ///
    /// # Errors
    ///
    /// See [`lock_action`](Self::lock_action)
    pub async fn lock(
        &self,
        credential: &LockCredential,
        identity: &ClientIdentity,
    ) -> Result<(), NukiError> {
        self.lock_action(LockAction::Lock, credential, identity).await
    }

    /// Unlock the door
    ///
    /// # Errors
    ///
    /// See [`lock_action`](Self::lock_action)
    pub async fn unlock(
        &self,
        credential: &LockCredential,
        identity: &ClientIdentity,
    ) -> Result<(), NukiError> {
        self.lock_action(LockAction::Unlock, credential, identity).await
    }

    /// Unlock and pull the latch
    ///
    /// # Errors
    ///
    /// See [`lock_action`](Self::lock_action)
    pub async fn unlatch(
        &self,
        credential: &LockCredential,
        identity: &ClientIdentity,
    ) -> Result<(), NukiError> {
        self.lock_action(LockAction::Unlatch, credential, identity).await
    }

    /// Perform a lock action and wait for STATUS COMPLETE
    ///
    /// # Errors
    ///
    /// Returns [`NukiError::InvalidParameter`] for an unknown action,
    /// [`NukiError::CommandInProgress`] if another command is running,
    /// [`NukiError::Timeout`] if the lock does not finish within the command
    /// timeout, and transport or protocol errors otherwise.
    pub async fn lock_action(
        &self,
        action: LockAction,
        credential: &LockCredential,
        identity: &ClientIdentity,
    ) -> Result<(), NukiError> {
        if let LockAction::Unknown(code) = action {
            return Err(NukiError::InvalidParameter {
                name: "action",
                message: format!("unknown lock action {code:#04x}"),
            });
        }
        self.run(CommandKind::LockAction(action), credential, identity, "lock_action")
            .await
            .map(|_| ())
    }

    /// Read the current lock state
    ///
    /// # Errors
    ///
    /// Same as [`lock_action`](Self::lock_action)
    pub async fn get_state(
        &self,
        credential: &LockCredential,
        identity: &ClientIdentity,
    ) -> Result<NukiStates, NukiError> {
        match self
            .run(CommandKind::GetState, credential, identity, "get_state")
            .await?
        {
            CommandOutcome::States(states) => Ok(states),
            CommandOutcome::Done => Err(ProtocolError::InvalidState {
                expected: "NUKI_STATES".to_string(),
                actual: "STATUS COMPLETE".to_string(),
            }
            .into()),
        }
    }

    /// Close the connection
    ///
    /// # Errors
    ///
    /// Returns error if the transport fails to disconnect
    pub async fn disconnect(self) -> Result<(), NukiError> {
        self.transport.into_inner().disconnect().await?;
        Ok(())
    }

    async fn run(
        &self,
        kind: CommandKind,
        credential: &LockCredential,
        identity: &ClientIdentity,
        operation: &'static str,
    ) -> Result<CommandOutcome, NukiError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::warn!(operation, "Rejecting command, another one is in progress");
            return Err(NukiError::CommandInProgress);
        };

        let mut transport = self.transport.lock().await;
        let characteristic = Characteristic::UserSpecificDataIo;
        require_characteristic(&mut *transport, characteristic).await?;

        let session =
            CommandSession::new(kind, credential, identity, self.config.max_frame_len);
        transport.subscribe(characteristic).await?;

        let deadline = Deadline::after(self.config.command_timeout, operation);
        let result = deadline.run(exchange(&mut *transport, session)).await;
        if let Err(e) = transport.unsubscribe(characteristic).await {
            tracing::debug!("Unsubscribe after {operation} failed: {e}");
        }

        result.and_then(|outcome| outcome)
    }
}

async fn exchange<T: LockTransport + ?Sized>(
    transport: &mut T,
    mut session: CommandSession,
) -> Result<CommandOutcome, NukiError> {
    let characteristic = Characteristic::UserSpecificDataIo;
    let request = session.start()?;
    transport.write(characteristic, &request).await?;

    loop {
        let chunk = transport.next_notification(characteristic).await?;
        match session.feed(&chunk)? {
            CommandStep::Send(frame) => transport.write(characteristic, &frame).await?,
            CommandStep::NeedData => {}
            CommandStep::Complete(outcome) => return Ok(outcome),
        }
    }
}
