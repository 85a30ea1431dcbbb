//! Decoder for the NUKI_STATES payload and the enums it carries

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use super::error::ProtocolError;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// Value not known to this crate
            Unknown(u8),
        }

        impl $name {
            /// Human readable description
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::Unknown(_) => "unknown",
                }
            }
        }

        impl From<u8> for $name {
            fn from(value: u8) -> Self {
                match value {
                    $($value => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $value,)+
                    $name::Unknown(other) => other,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Operating mode of the lock
    NukiMode {
        /// Normal operation
        Door = 2 => "door mode",
        /// Permanently unlatched, e.g. for shops
        Continuous = 3 => "continuous mode",
    }
}

wire_enum! {
    /// Position of the lock
    LockState {
        /// Not calibrated yet
        Uncalibrated = 0x00 => "uncalibrated",
        /// Locked
        Locked = 0x01 => "locked",
        /// Unlocking
        Unlocking = 0x02 => "unlocking",
        /// Unlocked
        Unlocked = 0x03 => "unlocked",
        /// Locking
        Locking = 0x04 => "locking",
        /// Unlatched
        Unlatched = 0x05 => "unlatched",
        /// Unlocked, lock'n'go pending
        UnlockedLockNGo = 0x06 => "unlocked - lock'n'go",
        /// Unlatching
        Unlatching = 0x07 => "unlatching",
        /// Calibration in progress
        Calibration = 0xFC => "calibration",
        /// Boot run in progress
        BootRun = 0xFD => "boot run",
        /// Motor blocked
        MotorBlocked = 0xFE => "motor blocked",
        /// Undefined
        Undefined = 0xFF => "undefined",
    }
}

wire_enum! {
    /// What caused a state change
    Trigger {
        /// Bluetooth command
        Bluetooth = 0 => "bluetooth",
        /// Key turned by hand
        Manual = 1 => "manual",
        /// Button on the lock
        Button = 2 => "button",
        /// Time control
        Automatic = 3 => "automatic",
        /// Auto lock
        AutoLock = 6 => "auto lock",
    }
}

wire_enum! {
    /// Action requested with a LOCK_ACTION command
    LockAction {
        /// Unlock
        Unlock = 0x01 => "unlock",
        /// Lock
        Lock = 0x02 => "lock",
        /// Unlock and pull the latch
        Unlatch = 0x03 => "unlatch",
        /// Unlock, then lock again after the lock'n'go timer
        LockNGo = 0x04 => "lock'n'go",
        /// Lock'n'go with unlatch
        LockNGoWithUnlatch = 0x05 => "lock'n'go with unlatch",
        /// Lock with two full turns
        FullLock = 0x06 => "full lock",
        /// Fob action 1
        FobAction1 = 0x81 => "fob action 1",
        /// Fob action 2
        FobAction2 = 0x82 => "fob action 2",
        /// Fob action 3
        FobAction3 = 0x83 => "fob action 3",
    }
}

wire_enum! {
    /// Outcome of the last lock action
    CompletionStatus {
        /// Success
        Success = 0x00 => "success",
        /// Motor blocked
        MotorBlocked = 0x01 => "motor blocked",
        /// Canceled
        Canceled = 0x02 => "canceled",
        /// Too recent
        TooRecent = 0x03 => "too recent",
        /// Busy
        Busy = 0x04 => "busy",
        /// Motor voltage too low
        LowMotorVoltage = 0x05 => "low motor voltage",
        /// Clutch failure
        ClutchFailure = 0x06 => "clutch failure",
        /// Motor power failure
        MotorPowerFailure = 0x07 => "motor power failure",
        /// Incomplete
        Incomplete = 0x08 => "incomplete",
        /// Other error
        OtherError = 0xFE => "other error",
        /// Unknown error
        UnknownError = 0xFF => "unknown error",
    }
}

/// Snapshot of the lock state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NukiStates {
    /// Door or continuous mode
    pub nuki_mode: NukiMode,
    /// Current lock state
    pub lock_state: LockState,
    /// What caused the current state
    pub trigger: Trigger,
    /// Lock clock, shifted into the reported UTC offset; `None` if the fields do not form a valid date
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Offset of the lock's local time from UTC
    pub utc_offset_minutes: i16,
    /// Battery needs replacing
    pub battery_critical: bool,
    /// Bumped on every configuration change
    pub config_update_count: u8,
    /// Seconds left before a lock'n'go locks
    pub lock_n_go_timer: u8,
    /// Most recent lock action
    pub last_lock_action: LockAction,
    /// What triggered the most recent action
    pub last_lock_action_trigger: Trigger,
    /// How the most recent action ended
    pub last_lock_action_completion_status: CompletionStatus,
}

impl NukiStates {
    /// Length of the fields decoded here; newer firmware may append more
    pub const MIN_LEN: usize = 18;

    /// Decode a NUKI_STATES payload
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedFrame`] if the payload is shorter than
    /// [`Self::MIN_LEN`].
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::MIN_LEN {
            return Err(ProtocolError::MalformedFrame {
                reason: format!(
                    "NUKI_STATES payload of {} bytes, need {}",
                    payload.len(),
                    Self::MIN_LEN
                ),
            });
        }

        let utc_offset_minutes = LittleEndian::read_i16(&payload[10..12]);
        let timestamp = decode_timestamp(
            LittleEndian::read_u16(&payload[3..5]),
            &payload[5..10],
            utc_offset_minutes,
        );

        Ok(Self {
            nuki_mode: payload[0].into(),
            lock_state: payload[1].into(),
            trigger: payload[2].into(),
            timestamp,
            utc_offset_minutes,
            battery_critical: payload[12] != 0,
            config_update_count: payload[13],
            lock_n_go_timer: payload[14],
            last_lock_action: payload[15].into(),
            last_lock_action_trigger: payload[16].into(),
            last_lock_action_completion_status: payload[17].into(),
        })
    }

    /// Description of the lock state
    #[must_use]
    pub fn lock_state_str(&self) -> &'static str {
        self.lock_state.as_str()
    }

    /// Description of the trigger
    #[must_use]
    pub fn trigger_str(&self) -> &'static str {
        self.trigger.as_str()
    }

    /// `"critical"` or `"ok"`
    #[must_use]
    pub fn battery_critical_str(&self) -> &'static str {
        if self.battery_critical { "critical" } else { "ok" }
    }
}

/// Build the timestamp from UTC fields `month, day, hour, minute, second`
fn decode_timestamp(year: u16, fields: &[u8], offset_minutes: i16) -> Option<DateTime<FixedOffset>> {
    let [month, day, hour, minute, second] = *fields else {
        return None;
    };
    let naive = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))?
        .and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))?;
    let offset = FixedOffset::east_opt(i32::from(offset_minutes) * 60)?;
    Some(Utc.from_utc_datetime(&naive).with_timezone(&offset))
}
