use tracing::{debug, info};

use crate::device::{DeviceMetadata, DeviceRecord};
use crate::instances::{find_instance_index, is_selected_instance};
use crate::reducer::RegistryState;

const TAG: &str = " | extra_reducers | ";

/// Reducers supplied by the embedding application for events whose payload
/// the registry treats as opaque: labeling metadata and restored storage.
pub trait ExtraReducers {
    fn set_device_metadata(
        &self,
        state: &mut RegistryState,
        device: &DeviceRecord,
        metadata: &DeviceMetadata,
    );

    fn storage_load(&self, state: &mut RegistryState, devices: &[DeviceRecord]);
}

/// Stores metadata on the matching instance and restores remembered devices
/// from storage as disconnected records.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtraReducers;

impl ExtraReducers for DefaultExtraReducers {
    fn set_device_metadata(
        &self,
        state: &mut RegistryState,
        device: &DeviceRecord,
        metadata: &DeviceMetadata,
    ) {
        if !device.is_acquired() {
            return;
        }
        if let Some(index) = find_instance_index(&state.devices, device) {
            state.devices[index].metadata = metadata.clone();
        }
    }

    fn storage_load(&self, state: &mut RegistryState, devices: &[DeviceRecord]) {
        for stored in devices {
            if !stored.is_acquired() || !stored.remember {
                debug!("{TAG} skipping stored device {:?}, not remembered", stored.id);
                continue;
            }
            if state.devices.iter().any(|d| is_selected_instance(stored, d)) {
                continue;
            }
            let mut restored = stored.clone();
            restored.connected = false;
            restored.available = false;
            restored.path.clear();
            restored.button_requests.clear();
            info!("{TAG} restored device {:?} instance {:?}", restored.id, restored.instance);
            state.devices.push(restored);
        }
    }
}
