//! Transport that plays back canned notifications

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::protocol::constants::sizes;
use crate::transport::{Characteristic, LockTransport, TransportError};

/// Frames written through a [`ScriptedTransport`], shared with the test
#[derive(Debug, Clone, Default)]
pub struct WriteLog(Arc<Mutex<Vec<(Characteristic, Vec<u8>)>>>);

impl WriteLog {
    /// Snapshot of all writes so far
    #[must_use]
    pub fn writes(&self) -> Vec<(Characteristic, Vec<u8>)> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of writes so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes().len()
    }

    /// Whether nothing was written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, characteristic: Characteristic, data: &[u8]) {
        let mut writes = self
            .0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writes.push((characteristic, data.to_vec()));
    }
}

/// Each write releases the next scripted reply round
///
/// Replies are split into notification-sized fragments. Once the script is
/// exhausted, [`LockTransport::next_notification`] never resolves, which
/// models a lock that stopped answering.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    rounds: VecDeque<Vec<Vec<u8>>>,
    pending: VecDeque<Vec<u8>>,
    log: WriteLog,
}

impl ScriptedTransport {
    /// Create an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reply round sent after the next unanswered write
    #[must_use]
    pub fn then_reply(mut self, frames: Vec<Vec<u8>>) -> Self {
        let fragments = frames
            .iter()
            .flat_map(|frame| frame.chunks(sizes::NOTIFICATION_MTU).map(<[u8]>::to_vec))
            .collect();
        self.rounds.push_back(fragments);
        self
    }

    /// Handle on the writes made through this transport
    #[must_use]
    pub fn write_log(&self) -> WriteLog {
        self.log.clone()
    }
}

#[async_trait]
impl LockTransport for ScriptedTransport {
    async fn discover_characteristics(&mut self) -> Result<Vec<Uuid>, TransportError> {
        Ok(vec![
            Characteristic::PairingGeneralDataIo.uuid(),
            Characteristic::UserSpecificDataIo.uuid(),
        ])
    }

    async fn subscribe(&mut self, _characteristic: Characteristic) -> Result<(), TransportError> {
        Ok(())
    }

    async fn unsubscribe(&mut self, _characteristic: Characteristic) -> Result<(), TransportError> {
        Ok(())
    }

    async fn write(
        &mut self,
        characteristic: Characteristic,
        data: &[u8],
    ) -> Result<(), TransportError> {
        self.log.push(characteristic, data);
        if let Some(round) = self.rounds.pop_front() {
            self.pending.extend(round);
        }
        Ok(())
    }

    async fn next_notification(
        &mut self,
        _characteristic: Characteristic,
    ) -> Result<Vec<u8>, TransportError> {
        match self.pending.pop_front() {
            Some(chunk) => Ok(chunk),
            None => std::future::pending().await,
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
