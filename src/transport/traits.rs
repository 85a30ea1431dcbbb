use async_trait::async_trait;
use uuid::Uuid;

use super::{Characteristic, Peripheral, TransportError};

/// GATT access to one connected lock
///
/// Notifications for a subscribed characteristic must be delivered by
/// [`next_notification`](Self::next_notification) in the order the lock sent
/// them. Only one subscriber per characteristic is active at a time.
#[async_trait]
pub trait LockTransport: Send {
    /// Discover the characteristics of the pairing and keyturner services
    async fn discover_characteristics(&mut self) -> Result<Vec<Uuid>, TransportError>;

    /// Enable notifications
    async fn subscribe(&mut self, characteristic: Characteristic) -> Result<(), TransportError>;

    /// Disable notifications
    async fn unsubscribe(&mut self, characteristic: Characteristic) -> Result<(), TransportError>;

    /// Write with response
    async fn write(
        &mut self,
        characteristic: Characteristic,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Wait for the next notification fragment
    async fn next_notification(
        &mut self,
        characteristic: Characteristic,
    ) -> Result<Vec<u8>, TransportError>;

    /// Drop the connection
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// Connects to discovered peripherals
#[async_trait]
pub trait Central: Send {
    /// Connection type handed out by [`connect`](Self::connect)
    type Link: LockTransport;

    /// Connect to a peripheral
    async fn connect(&mut self, peripheral: &Peripheral) -> Result<Self::Link, TransportError>;
}
