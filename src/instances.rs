//! Identity rules for device instances.
//!
//! Records sharing a hardware `id` are instances of the same physical device;
//! `instance` tells them apart.

use crate::device::DeviceRecord;

/// True if both records are acquired and refer to the same instance.
pub fn is_selected_instance(selected: &DeviceRecord, device: &DeviceRecord) -> bool {
    selected.is_acquired()
        && device.is_acquired()
        && selected.id == device.id
        && selected.instance == device.instance
}

pub fn find_instance_index(devices: &[DeviceRecord], device: &DeviceRecord) -> Option<usize> {
    devices.iter().position(|d| is_selected_instance(device, d))
}

/// Acquired instances sharing `selected`'s hardware id, ordered by instance.
/// With `exclude_selected` the selected instance itself is left out.
pub fn device_instances<'a>(
    selected: &DeviceRecord,
    devices: &'a [DeviceRecord],
    exclude_selected: bool,
) -> Vec<&'a DeviceRecord> {
    let mut instances: Vec<&DeviceRecord> = devices
        .iter()
        .filter(|d| {
            d.is_acquired()
                && d.id == selected.id
                && (!exclude_selected || d.instance != selected.instance)
        })
        .collect();
    instances.sort_by_key(|d| d.instance);
    instances
}

/// Next instance ordinal for hardware `id`, 1 when no acquired record has that id.
/// `None` once a stored record holds `u32::MAX`.
pub fn new_instance_number(devices: &[DeviceRecord], id: Option<&str>) -> Option<u32> {
    devices
        .iter()
        .filter(|d| d.is_acquired() && d.id.as_deref() == id)
        .map(|d| d.instance.unwrap_or(0))
        .max()
        .map_or(Some(1), |highest| highest.checked_add(1))
}

/// Next wallet number for a hidden wallet on hardware `id`, `None` when exhausted.
pub fn new_wallet_number(devices: &[DeviceRecord], id: Option<&str>) -> Option<u32> {
    devices
        .iter()
        .filter(|d| d.is_acquired() && d.id.as_deref() == id && !d.use_empty_passphrase)
        .filter_map(|d| d.wallet_number)
        .max()
        .map_or(Some(1), |highest| highest.checked_add(1))
}
