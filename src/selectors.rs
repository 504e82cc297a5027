//! Read-only queries over [`RegistryState`].

use std::collections::BTreeMap;

use crate::device::{DeviceRecord, DeviceStatus, UnavailableReason};
use crate::discovery::{Discovery, DiscoveryLookup, DiscoveryStatus};
use crate::networks::NetworkTable;
use crate::reducer::RegistryState;
use crate::utils::is_newer_or_equal;

pub fn devices(state: &RegistryState) -> &[DeviceRecord] {
    &state.devices
}

pub fn devices_count(state: &RegistryState) -> usize {
    state.devices.len()
}

/// True until the transport has reported its first device.
pub fn is_pending_transport_event(state: &RegistryState) -> bool {
    state.devices.is_empty()
}

pub fn selected_device(state: &RegistryState) -> Option<&DeviceRecord> {
    state.selected_device.as_ref()
}

pub fn selected_unavailable_capabilities(
    state: &RegistryState,
) -> Option<&BTreeMap<String, UnavailableReason>> {
    state.selected_device.as_ref().map(|d| &d.unavailable_capabilities)
}

pub fn selected_device_status(state: &RegistryState) -> Option<DeviceStatus> {
    state.selected_device.as_ref().map(DeviceRecord::status)
}

pub fn device_by_id<'a>(state: &'a RegistryState, device_id: &str) -> Option<&'a DeviceRecord> {
    state.devices.iter().find(|d| d.id.as_deref() == Some(device_id))
}

pub fn discovery_for_device<D>(state: &RegistryState, discovery: &D) -> Option<Discovery>
where
    D: DiscoveryLookup + ?Sized,
{
    let device_state = state.selected_device.as_ref()?.state.as_deref()?;
    discovery.discovery_by_device_state(device_state)
}

pub fn is_device_discovery_active<D>(state: &RegistryState, discovery: &D) -> bool
where
    D: DiscoveryLookup + ?Sized,
{
    discovery_for_device(state, discovery).map_or(false, |d| {
        matches!(d.status, DiscoveryStatus::Running | DiscoveryStatus::Stopping)
    })
}

pub fn is_device_ready_for_discovery(state: &RegistryState) -> bool {
    state
        .selected_device
        .as_ref()
        .map_or(false, |d| d.connected && !d.auth_failed && !d.auth_confirm)
}

/// True while discovery for the selected device is running (or completed)
/// and waits for the user to confirm the passphrase.
pub fn is_discovery_auth_confirmation_required<D>(state: &RegistryState, discovery: &D) -> bool
where
    D: DiscoveryLookup + ?Sized,
{
    discovery_for_device(state, discovery).map_or(false, |d| {
        d.auth_confirm
            && (d.status < DiscoveryStatus::Stopping || d.status == DiscoveryStatus::Completed)
    })
}

/// Symbols of the networks usable with the selected device, in table order.
///
/// A network is dropped only when the device reports it as unsupported or
/// lacking the capability. Firmware older than the app's per-model minimum
/// marks it as requiring an update, which still lists it.
pub fn supported_networks(state: &RegistryState, networks: &NetworkTable) -> Vec<String> {
    let device = state.selected_device.as_ref();
    let features = device.and_then(|d| d.features.as_ref());
    let internal_model = features.and_then(|f| f.internal_model.as_deref());
    let firmware_version = features.and_then(|f| f.firmware_version()).unwrap_or_default();

    networks
        .iter()
        .filter(|network| {
            let restriction = internal_model.and_then(|model| network.support.get(model));
            let supported_by_app = restriction.map_or(true, |min| {
                is_newer_or_equal(&firmware_version, min).unwrap_or(false)
            });
            let reason = if supported_by_app {
                device.and_then(|d| d.unavailable_capabilities.get(&network.symbol).copied())
            } else {
                Some(UnavailableReason::UpdateRequired)
            };
            !matches!(reason, Some(UnavailableReason::NoSupport | UnavailableReason::NoCapability))
        })
        .map(|network| network.symbol.clone())
        .collect()
}
