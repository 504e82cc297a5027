use serde::{Deserialize, Serialize};

use crate::device::{ButtonRequest, Device, DeviceMetadata, DeviceRecord};

/// Every event the registry reacts to.
///
/// Transport events carry a [`Device`] snapshot, user and session events
/// carry the [`DeviceRecord`] they refer to. Serialized adjacently tagged, so
/// an event log reads as `{"type": "connect", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum DeviceAction {
    Connect(Device),
    ConnectUnacquired(Device),
    DeviceChanged(Device),
    DeviceDisconnect(Device),
    #[serde(rename_all = "camelCase")]
    UpdatePassphraseMode {
        device: DeviceRecord,
        hidden: bool,
        #[serde(default)]
        always_on_device: bool,
    },
    AuthFailed(DeviceRecord),
    ReceiveAuthConfirm {
        device: DeviceRecord,
        success: bool,
    },
    CreateDeviceInstance(DeviceRecord),
    #[serde(rename_all = "camelCase")]
    RememberDevice {
        device: DeviceRecord,
        remember: bool,
        #[serde(default)]
        force_remember: bool,
    },
    ForgetDevice(DeviceRecord),
    AuthDevice {
        device: DeviceRecord,
        state: String,
    },
    #[serde(rename_all = "camelCase")]
    AddButtonRequest {
        #[serde(default)]
        device: Option<DeviceRecord>,
        #[serde(default)]
        button_request: Option<ButtonRequest>,
    },
    RequestDeviceReconnect,
    SelectDevice(Option<DeviceRecord>),
    UpdateSelectedDevice(Option<DeviceRecord>),
    SetDeviceMetadata {
        device: DeviceRecord,
        metadata: DeviceMetadata,
    },
    StorageLoad {
        devices: Vec<DeviceRecord>,
    },
}

impl DeviceAction {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceAction::Connect(_) => "connect",
            DeviceAction::ConnectUnacquired(_) => "connect-unacquired",
            DeviceAction::DeviceChanged(_) => "device-changed",
            DeviceAction::DeviceDisconnect(_) => "device-disconnect",
            DeviceAction::UpdatePassphraseMode { .. } => "update-passphrase-mode",
            DeviceAction::AuthFailed(_) => "auth-failed",
            DeviceAction::ReceiveAuthConfirm { .. } => "receive-auth-confirm",
            DeviceAction::CreateDeviceInstance(_) => "create-device-instance",
            DeviceAction::RememberDevice { .. } => "remember-device",
            DeviceAction::ForgetDevice(_) => "forget-device",
            DeviceAction::AuthDevice { .. } => "auth-device",
            DeviceAction::AddButtonRequest { .. } => "add-button-request",
            DeviceAction::RequestDeviceReconnect => "request-device-reconnect",
            DeviceAction::SelectDevice(_) => "select-device",
            DeviceAction::UpdateSelectedDevice(_) => "update-selected-device",
            DeviceAction::SetDeviceMetadata { .. } => "set-device-metadata",
            DeviceAction::StorageLoad { .. } => "storage-load",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_event_log() {
        let log = json!([
            {"type": "connect-unacquired", "payload": {"type": "unacquired", "path": "A"}},
            {"type": "connect", "payload": {
                "type": "acquired", "id": "X1", "path": "A",
                "features": {"passphrase_protection": false, "unlocked": true}
            }},
            {"type": "request-device-reconnect"},
            {"type": "add-button-request", "payload": {"device": null}},
            {"type": "device-disconnect", "payload": {"type": "acquired", "path": "A"}}
        ]);

        let actions: Vec<DeviceAction> = serde_json::from_value(log).unwrap();
        assert_eq!(actions.len(), 5);
        assert_eq!(actions[0].name(), "connect-unacquired");
        match &actions[1] {
            DeviceAction::Connect(device) => {
                assert_eq!(device.id.as_deref(), Some("X1"));
                assert_eq!(device.features.as_ref().and_then(|f| f.unlocked), Some(true));
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(actions[2], DeviceAction::RequestDeviceReconnect);
        assert_eq!(
            actions[3],
            DeviceAction::AddButtonRequest { device: None, button_request: None }
        );
    }
}
