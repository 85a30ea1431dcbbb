//! Nuki BLE protocol constants
//!
//! Command identifiers, status and error codes, GATT identifiers and the
//! fixed sizes of protocol fields.

use std::fmt;

use uuid::Uuid;

/// Command identifier carried little-endian in the first two bytes of every frame
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub u16);

impl CommandId {
    pub const REQUEST_DATA: Self = Self(0x0001);
    pub const PUBLIC_KEY: Self = Self(0x0003);
    pub const CHALLENGE: Self = Self(0x0004);
    pub const AUTHORIZATION_AUTHENTICATOR: Self = Self(0x0005);
    pub const AUTHORIZATION_DATA: Self = Self(0x0006);
    pub const AUTHORIZATION_ID: Self = Self(0x0007);
    pub const REMOVE_AUTHORIZATION_ENTRY: Self = Self(0x0008);
    pub const AUTHORIZATION_DATA_INVITE: Self = Self(0x000B);
    pub const NUKI_STATES: Self = Self(0x000C);
    pub const LOCK_ACTION: Self = Self(0x000D);
    pub const STATUS: Self = Self(0x000E);
    pub const ERROR: Self = Self(0x0012);
    pub const SET_CONFIG: Self = Self(0x0013);
    pub const REQUEST_CONFIG: Self = Self(0x0014);
    pub const CONFIG: Self = Self(0x0015);
    pub const REQUEST_CALIBRATION: Self = Self(0x001A);
    pub const AUTHORIZATION_ID_CONFIRMATION: Self = Self(0x001E);
    pub const VERIFY_PIN: Self = Self(0x0020);
    pub const UPDATE_TIME: Self = Self(0x0021);

    /// Wire representation
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Read a command id from the first two bytes of `bytes`
    #[must_use]
    pub fn from_prefix(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [lo, hi, ..] => Some(Self(u16::from_le_bytes([*lo, *hi]))),
            _ => None,
        }
    }

    /// Protocol name of the command, if known
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::REQUEST_DATA => "REQUEST_DATA",
            Self::PUBLIC_KEY => "PUBLIC_KEY",
            Self::CHALLENGE => "CHALLENGE",
            Self::AUTHORIZATION_AUTHENTICATOR => "AUTHORIZATION_AUTHENTICATOR",
            Self::AUTHORIZATION_DATA => "AUTHORIZATION_DATA",
            Self::AUTHORIZATION_ID => "AUTHORIZATION_ID",
            Self::REMOVE_AUTHORIZATION_ENTRY => "REMOVE_AUTHORIZATION_ENTRY",
            Self::AUTHORIZATION_DATA_INVITE => "AUTHORIZATION_DATA_INVITE",
            Self::NUKI_STATES => "NUKI_STATES",
            Self::LOCK_ACTION => "LOCK_ACTION",
            Self::STATUS => "STATUS",
            Self::ERROR => "ERROR",
            Self::SET_CONFIG => "SET_CONFIG",
            Self::REQUEST_CONFIG => "REQUEST_CONFIG",
            Self::CONFIG => "CONFIG",
            Self::REQUEST_CALIBRATION => "REQUEST_CALIBRATION",
            Self::AUTHORIZATION_ID_CONFIRMATION => "AUTHORIZATION_ID_CONFIRMATION",
            Self::VERIFY_PIN => "VERIFY_PIN",
            Self::UPDATE_TIME => "UPDATE_TIME",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}(0x{:04x})", self.0),
            None => write!(f, "CommandId(0x{:04x})", self.0),
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Values of the single status byte in a STATUS frame
pub mod status {
    /// Command finished
    pub const COMPLETE: u8 = 0x00;
    /// Command accepted, completion follows
    pub const ACCEPTED: u8 = 0x01;
}

/// Error codes reported in an ERROR frame
pub mod error_codes {
    pub const P_ERROR_NOT_PAIRING: u8 = 0x10;
    pub const P_ERROR_BAD_AUTHENTICATOR: u8 = 0x11;
    pub const P_ERROR_BAD_PARAMETER: u8 = 0x12;
    pub const P_ERROR_MAX_USER: u8 = 0x13;
    pub const K_ERROR_BAD_PIN: u8 = 0x21;
    pub const K_ERROR_BAD_NONCE: u8 = 0x22;
    pub const K_ERROR_BAD_PARAMETER: u8 = 0x23;
    pub const ERROR_BAD_CRC: u8 = 0xFD;
    pub const ERROR_BAD_LENGTH: u8 = 0xFE;
    pub const ERROR_UNKNOWN: u8 = 0xFF;
}

/// GATT services and characteristics exposed by the lock
pub mod gatt {
    use super::Uuid;

    /// Pairing service
    pub const PAIRING_SERVICE: Uuid = Uuid::from_u128(0xa92e_e100_5501_11e4_916c_0800_200c_9a66);
    /// Keyturner service, also advertised in the iBeacon payload
    pub const KEYTURNER_SERVICE: Uuid = Uuid::from_u128(0xa92e_e200_5501_11e4_916c_0800_200c_9a66);
    /// Pairing general data input/output
    pub const PAIRING_GDIO: Uuid = Uuid::from_u128(0xa92e_e101_5501_11e4_916c_0800_200c_9a66);
    /// Keyturner general data input/output
    pub const SERVICE_GDIO: Uuid = Uuid::from_u128(0xa92e_e201_5501_11e4_916c_0800_200c_9a66);
    /// User-specific data input/output, carries encrypted commands
    pub const USER_SPECIFIC_DIO: Uuid = Uuid::from_u128(0xa92e_e202_5501_11e4_916c_0800_200c_9a66);
}

/// Field sizes
pub mod sizes {
    /// Command id prefix
    pub const COMMAND_ID: usize = 2;
    /// CRC suffix
    pub const CRC: usize = 2;
    /// Curve25519 public key
    pub const PUBLIC_KEY: usize = 32;
    /// Pairing challenge and client nonce
    pub const PAIRING_NONCE: usize = 32;
    /// HMAC-SHA256 authenticator
    pub const AUTHENTICATOR: usize = 32;
    /// Secretbox nonce on the command channel
    pub const COMMAND_NONCE: usize = 24;
    /// Poly1305 tag leading every ciphertext
    pub const MAC: usize = 16;
    /// Authorization id
    pub const AUTHORIZATION_ID: usize = 4;
    /// Lock UUID
    pub const LOCK_UUID: usize = 16;
    /// Space padded client name in the authorization data
    pub const NAME: usize = 32;
    /// Nonce, authorization id and ciphertext length preceding a ciphertext
    pub const ENCRYPTED_HEADER: usize = COMMAND_NONCE + AUTHORIZATION_ID + 2;
    /// Largest notification the lock sends in one piece
    pub const NOTIFICATION_MTU: usize = 20;
}
