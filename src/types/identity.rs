use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::protocol::constants::sizes;

/// Kind of client enrolled on the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum AppType {
    /// Smartphone app
    App,
    /// Nuki Bridge
    Bridge,
    /// Key fob
    Fob,
    /// Keypad
    Keypad,
    /// Type not known to this crate
    Other(u8),
}

impl From<u8> for AppType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::App,
            1 => Self::Bridge,
            2 => Self::Fob,
            3 => Self::Keypad,
            other => Self::Other(other),
        }
    }
}

impl From<AppType> for u8 {
    fn from(value: AppType) -> Self {
        match value {
            AppType::App => 0,
            AppType::Bridge => 1,
            AppType::Fob => 2,
            AppType::Keypad => 3,
            AppType::Other(other) => other,
        }
    }
}

/// This client's identity as enrolled on the lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Application id, echoed in every lock action
    #[serde(rename = "appId")]
    pub app_id: u32,
    /// Client type
    #[serde(rename = "appType")]
    pub app_type: AppType,
    /// Display name shown in the Nuki app
    pub name: String,
}

impl ClientIdentity {
    /// Create an identity
    pub fn new(app_id: u32, app_type: AppType, name: impl Into<String>) -> Self {
        Self {
            app_id,
            app_type,
            name: name.into(),
        }
    }

    /// Create a fob identity with a random app id, named `"<prefix> <app id>"`
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let app_id = rand::rngs::OsRng.next_u32();
        Self::new(app_id, AppType::Fob, format!("{prefix} {app_id}"))
    }

    /// Name as sent in the authorization data: 32 bytes, space padded
    ///
    /// Longer names are cut at the last character boundary that fits.
    #[must_use]
    pub fn padded_name(&self) -> [u8; sizes::NAME] {
        let mut out = [b' '; sizes::NAME];
        let mut end = self.name.len().min(sizes::NAME);
        while !self.name.is_char_boundary(end) {
            end -= 1;
        }
        out[..end].copy_from_slice(&self.name.as_bytes()[..end]);
        out
    }
}
