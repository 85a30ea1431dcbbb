use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Long-term symmetric key shared with one lock
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Wrap raw key bytes
    #[must_use]
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Key bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, the persisted representation
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from 64 hex characters
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not hex or not 32 bytes long
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

impl Serialize for SharedSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SharedSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Everything needed to talk to a paired lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockCredential {
    /// UUID the lock reported during pairing
    #[serde(rename = "nukiUuid", with = "uuid::serde::simple")]
    pub lock_uuid: Uuid,
    /// Authorization id assigned to this client
    #[serde(rename = "nukiAuthorizationId")]
    pub authorization_id: u32,
    /// Long-term key
    #[serde(rename = "sharedSecret")]
    pub shared_secret: SharedSecret,
}

/// Result of pairing with a discovered peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedLock {
    /// Transport identity of the peripheral
    pub peripheral_id: String,
    /// Credential for subsequent commands
    pub credential: LockCredential,
}
