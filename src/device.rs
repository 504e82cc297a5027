use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::features::Features;

/// Current time as unix milliseconds, used for record recency.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    Acquired,
    Unacquired,
    Unreadable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceMode {
    #[default]
    Normal,
    Bootloader,
    Initialize,
    Seedless,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FirmwareStatus {
    Valid,
    Outdated,
    Required,
    #[default]
    Unknown,
    #[serde(rename = "none")]
    Missing,
}

/// Why a network cannot be used with a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnavailableReason {
    NoCapability,
    NoSupport,
    UpdateRequired,
    TrezorConnectOutdated,
}

/// An on-device confirmation prompt waiting for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ButtonRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into(), data: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataStatus {
    #[default]
    Disabled,
    Enabled,
    Cancelled,
}

/// Labeling metadata state attached to a device instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub status: MetadataStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// A device as reported by the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub id: Option<String>,
    pub path: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub features: Option<Features>,
    #[serde(default)]
    pub mode: DeviceMode,
    #[serde(default)]
    pub firmware: FirmwareStatus,
    #[serde(default)]
    pub unavailable_capabilities: BTreeMap<String, UnavailableReason>,
}

impl Device {
    /// A device the transport sees but could not read features from yet.
    pub fn unacquired(path: impl Into<String>) -> Self {
        Self {
            device_type: DeviceType::Unacquired,
            id: None,
            path: path.into(),
            label: String::new(),
            features: None,
            mode: DeviceMode::Normal,
            firmware: FirmwareStatus::Unknown,
            unavailable_capabilities: BTreeMap::new(),
        }
    }

    pub fn acquired(path: impl Into<String>, id: impl Into<String>, features: Features) -> Self {
        Self {
            device_type: DeviceType::Acquired,
            id: Some(id.into()),
            label: features.label.clone().unwrap_or_default(),
            mode: if features.bootloader_mode.unwrap_or(false) {
                DeviceMode::Bootloader
            } else {
                DeviceMode::Normal
            },
            firmware: FirmwareStatus::Valid,
            features: Some(features),
            ..Self::unacquired(path)
        }
    }
}

/// Derived status of a record, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceStatus {
    Connected,
    Disconnected,
    Unavailable,
    Bootloader,
    Initialize,
    Seedless,
    FirmwareRequired,
    UsedInOtherWindow,
    Unreadable,
}

/// One instance of a physical device as known to the registry.
///
/// Several records may share the same `id`: the standard wallet and any
/// passphrase-derived hidden wallets, told apart by `instance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub id: Option<String>,
    /// Transport session path, empty while disconnected but remembered
    pub path: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub features: Option<Features>,
    #[serde(default)]
    pub mode: DeviceMode,
    #[serde(default)]
    pub firmware: FirmwareStatus,
    #[serde(default)]
    pub unavailable_capabilities: BTreeMap<String, UnavailableReason>,

    /// Session token, present once authenticated against a passphrase
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub instance: Option<u32>,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub use_empty_passphrase: bool,
    #[serde(default)]
    pub passphrase_on_device: bool,
    #[serde(default)]
    pub remember: bool,
    #[serde(default)]
    pub force_remember: bool,
    #[serde(default)]
    pub auth_failed: bool,
    #[serde(default)]
    pub auth_confirm: bool,
    #[serde(default)]
    pub wallet_number: Option<u32>,
    #[serde(default)]
    pub button_requests: Vec<ButtonRequest>,
    #[serde(default)]
    pub metadata: DeviceMetadata,
    #[serde(default)]
    pub reconnect_requested: bool,
    /// Last touched, unix millis
    #[serde(default)]
    pub ts: i64,
}

impl DeviceRecord {
    /// Record seeded from a transport snapshot, with every registry flag cleared.
    pub fn from_device(device: &Device) -> Self {
        Self {
            device_type: device.device_type,
            id: device.id.clone(),
            path: device.path.clone(),
            label: device.label.clone(),
            features: device.features.clone(),
            mode: device.mode,
            firmware: device.firmware,
            unavailable_capabilities: device.unavailable_capabilities.clone(),
            state: None,
            instance: None,
            connected: false,
            available: false,
            use_empty_passphrase: false,
            passphrase_on_device: false,
            remember: false,
            force_remember: false,
            auth_failed: false,
            auth_confirm: false,
            wallet_number: None,
            button_requests: Vec::new(),
            metadata: DeviceMetadata::default(),
            reconnect_requested: false,
            ts: 0,
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.features.is_some()
    }

    /// Absorbs a fresh transport snapshot.
    ///
    /// `state` and `instance` are never taken from the snapshot, `id` only
    /// when the snapshot has one. Features follow [`Features::merged`].
    pub fn absorb(&mut self, upcoming: &Device) {
        self.device_type = upcoming.device_type;
        if upcoming.id.is_some() {
            self.id = upcoming.id.clone();
        }
        self.path = upcoming.path.clone();
        self.label = upcoming.label.clone();
        self.mode = upcoming.mode;
        self.firmware = upcoming.firmware;
        self.unavailable_capabilities = upcoming.unavailable_capabilities.clone();
        self.features = Some(Features::merged(self.features.as_ref(), upcoming.features.as_ref()));
    }

    pub fn status(&self) -> DeviceStatus {
        match self.device_type {
            DeviceType::Acquired => {
                if !self.connected {
                    DeviceStatus::Disconnected
                } else if !self.available {
                    DeviceStatus::Unavailable
                } else {
                    match self.mode {
                        DeviceMode::Bootloader => DeviceStatus::Bootloader,
                        DeviceMode::Initialize => DeviceStatus::Initialize,
                        DeviceMode::Seedless => DeviceStatus::Seedless,
                        DeviceMode::Normal if self.firmware == FirmwareStatus::Required => {
                            DeviceStatus::FirmwareRequired
                        }
                        DeviceMode::Normal => DeviceStatus::Connected,
                    }
                }
            }
            DeviceType::Unacquired => DeviceStatus::UsedInOtherWindow,
            DeviceType::Unreadable => DeviceStatus::Unreadable,
        }
    }
}
