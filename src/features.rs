use serde::{Deserialize, Serialize};

/// Capability and status snapshot reported by a device.
///
/// A locked device reports redacted features: every field is `None` except
/// `unlocked` and `busy`, which always reflect the live device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Unique device identifier
    pub device_id: Option<String>,
    /// Device label or name
    pub label: Option<String>,
    /// Device vendor
    pub vendor: Option<String>,
    /// Device model
    pub model: Option<String>,
    /// Internal model code, used to key firmware support tables
    pub internal_model: Option<String>,
    /// Firmware version components
    pub major_version: Option<u32>,
    pub minor_version: Option<u32>,
    pub patch_version: Option<u32>,
    /// Whether the device is in bootloader mode
    pub bootloader_mode: Option<bool>,
    /// Whether the device has been initialized
    pub initialized: Option<bool>,
    /// Whether PIN protection is enabled
    pub pin_protection: Option<bool>,
    /// Whether passphrase protection is enabled
    pub passphrase_protection: Option<bool>,
    /// Whether the passphrase must always be entered on the device
    pub passphrase_always_on_device: Option<bool>,
    /// Whether the device is currently unlocked. Absent on older firmware.
    pub unlocked: Option<bool>,
    /// Whether the device is processing another request
    pub busy: Option<bool>,
    /// Capability names advertised by the firmware
    pub capabilities: Vec<String>,
}

impl Features {
    /// Returns true if the device is not locked.
    ///
    /// Older firmware doesn't report `unlocked`; it also has no auto-lock, so
    /// it is always treated as unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked.unwrap_or(true)
    }

    pub fn has_passphrase_protection(&self) -> bool {
        self.passphrase_protection.unwrap_or(false)
    }

    /// Firmware version as "major.minor.patch", `None` while the version is redacted.
    pub fn firmware_version(&self) -> Option<String> {
        match (self.major_version, self.minor_version, self.patch_version) {
            (Some(major), Some(minor), Some(patch)) => {
                Some(format!("{}.{}.{}", major, minor, patch))
            }
            _ => None,
        }
    }

    /// Features a record keeps after absorbing an `upcoming` snapshot.
    ///
    /// A locked snapshot is redacted, so the last known features are kept
    /// instead, except for `unlocked` and `busy` which always come from
    /// `upcoming`.
    pub fn merged(current: Option<&Features>, upcoming: Option<&Features>) -> Features {
        let base = match upcoming {
            Some(f) if f.is_unlocked() => Some(f),
            _ => current,
        };
        Features {
            unlocked: upcoming.and_then(|f| f.unlocked),
            busy: upcoming.and_then(|f| f.busy),
            ..base.cloned().unwrap_or_default()
        }
    }
}
