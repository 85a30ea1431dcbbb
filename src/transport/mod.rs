//! Bluetooth transport abstraction
//!
//! The crate does not talk to a Bluetooth adapter itself. A backend
//! implements [`Central`] to connect to peripherals and [`LockTransport`] for
//! GATT access on a connected lock.

mod traits;

pub use traits::{Central, LockTransport};

use uuid::Uuid;

use crate::protocol::constants::gatt;

/// Characteristics used by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Pairing general data input/output
    PairingGeneralDataIo,
    /// Keyturner general data input/output
    ServiceGeneralDataIo,
    /// Keyturner user-specific data input/output
    UserSpecificDataIo,
}

impl Characteristic {
    /// GATT UUID of the characteristic
    #[must_use]
    pub fn uuid(self) -> Uuid {
        match self {
            Self::PairingGeneralDataIo => gatt::PAIRING_GDIO,
            Self::ServiceGeneralDataIo => gatt::SERVICE_GDIO,
            Self::UserSpecificDataIo => gatt::USER_SPECIFIC_DIO,
        }
    }

    /// GATT UUID of the owning service
    #[must_use]
    pub fn service(self) -> Uuid {
        match self {
            Self::PairingGeneralDataIo => gatt::PAIRING_SERVICE,
            Self::ServiceGeneralDataIo | Self::UserSpecificDataIo => gatt::KEYTURNER_SERVICE,
        }
    }

    /// Look up a characteristic by UUID
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        [
            Self::PairingGeneralDataIo,
            Self::ServiceGeneralDataIo,
            Self::UserSpecificDataIo,
        ]
        .into_iter()
        .find(|c| c.uuid() == uuid)
    }
}

/// A peripheral seen while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peripheral {
    /// Backend specific identity, stable across scans
    pub id: String,
    /// Advertised local name
    pub local_name: Option<String>,
    /// Whether the peripheral accepts connections
    pub connectable: bool,
    /// Signal strength
    pub rssi: Option<i16>,
    /// Raw manufacturer specific advertisement data
    pub manufacturer_data: Option<Vec<u8>>,
}

impl Peripheral {
    /// Create a connectable peripheral with a name and no advertisement data
    #[must_use]
    pub fn new(id: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            local_name: Some(local_name.into()),
            connectable: true,
            rssi: None,
            manufacturer_data: None,
        }
    }

    /// Attach manufacturer data
    #[must_use]
    pub fn with_manufacturer_data(mut self, data: Vec<u8>) -> Self {
        self.manufacturer_data = Some(data);
        self
    }
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connecting to the peripheral failed
    #[error("failed to connect to {peripheral_id}: {message}")]
    ConnectFailed {
        /// Peripheral that was dialled
        peripheral_id: String,
        /// Backend description
        message: String,
    },

    /// Link dropped
    #[error("peripheral disconnected")]
    Disconnected,

    /// Required characteristic was not discovered
    #[error("characteristic {0} not found")]
    CharacteristicMissing(Uuid),

    /// Write was not acknowledged
    #[error("write to {characteristic:?} failed: {message}")]
    WriteFailed {
        /// Target characteristic
        characteristic: Characteristic,
        /// Backend description
        message: String,
    },

    /// Enabling or disabling notifications failed
    #[error("subscription to {characteristic:?} failed: {message}")]
    SubscribeFailed {
        /// Target characteristic
        characteristic: Characteristic,
        /// Backend description
        message: String,
    },

    /// Any other backend failure
    #[error("transport error: {0}")]
    Backend(String),
}
