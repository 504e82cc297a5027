//! Reconciliation of device lifecycle events against the registry state.
//!
//! Every handler is a no-op on events it cannot apply (unacquired device,
//! unknown instance). Nothing here fails: callers serialize events and the
//! registry absorbs anomalies, logging them at `debug`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actions::DeviceAction;
use crate::device::{now_ms, ButtonRequest, Device, DeviceMetadata, DeviceMode, DeviceRecord};
use crate::extra::ExtraReducers;
use crate::features::Features;
use crate::instances::{
    device_instances, find_instance_index, is_selected_instance, new_instance_number,
    new_wallet_number,
};

const TAG: &str = " | device_reducer | ";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryState {
    pub devices: Vec<DeviceRecord>,
    /// Snapshot of the selected record. Not kept in sync with `devices`;
    /// only select/update-selected events replace it.
    #[serde(default)]
    pub selected_device: Option<DeviceRecord>,
}

/// Applies `action` to `state` and returns the resulting state. `state` is left untouched.
pub fn reduce(
    state: &RegistryState,
    action: &DeviceAction,
    extra: &dyn ExtraReducers,
) -> RegistryState {
    let mut next = state.clone();
    apply(&mut next, action, extra);
    next
}

fn apply(state: &mut RegistryState, action: &DeviceAction, extra: &dyn ExtraReducers) {
    debug!("{TAG} applying {}", action.name());
    match action {
        DeviceAction::Connect(device) | DeviceAction::ConnectUnacquired(device) => {
            connect_device(state, device)
        }
        DeviceAction::DeviceChanged(device) => change_device(
            state,
            device,
            Overrides { connected: Some(true), available: Some(true), ..Default::default() },
        ),
        DeviceAction::DeviceDisconnect(device) => disconnect_device(state, device),
        DeviceAction::UpdatePassphraseMode { device, hidden, always_on_device } => {
            change_passphrase_mode(state, device, *hidden, *always_on_device)
        }
        DeviceAction::AuthFailed(device) => auth_failed(state, device),
        DeviceAction::ReceiveAuthConfirm { device, success } => {
            auth_confirm(state, device, *success)
        }
        DeviceAction::CreateDeviceInstance(device) => create_instance(state, device),
        DeviceAction::RememberDevice { device, remember: should_remember, force_remember } => {
            remember(state, device, *should_remember, *force_remember)
        }
        DeviceAction::ForgetDevice(device) => forget(state, device),
        DeviceAction::AuthDevice { device, state: device_state } => {
            auth_device(state, device, device_state)
        }
        DeviceAction::AddButtonRequest { device, button_request } => {
            add_button_request(state, device.as_ref(), button_request.as_ref())
        }
        DeviceAction::RequestDeviceReconnect => {
            if let Some(selected) = state.selected_device.as_mut() {
                selected.reconnect_requested = true;
            }
        }
        DeviceAction::SelectDevice(device) => {
            update_timestamp(state, device.as_ref());
            state.selected_device = device.clone();
        }
        DeviceAction::UpdateSelectedDevice(device) => {
            state.selected_device = device.clone();
        }
        DeviceAction::SetDeviceMetadata { device, metadata } => {
            extra.set_device_metadata(state, device, metadata)
        }
        DeviceAction::StorageLoad { devices } => extra.storage_load(state, devices),
    }
}

/// Registry flags an absorbed snapshot forces onto a record.
#[derive(Debug, Clone, Copy, Default)]
struct Overrides {
    connected: Option<bool>,
    available: Option<bool>,
    use_empty_passphrase: Option<bool>,
}

fn merge(record: &DeviceRecord, upcoming: &Device, overrides: Overrides) -> DeviceRecord {
    let mut merged = record.clone();
    merged.absorb(upcoming);
    if let Some(connected) = overrides.connected {
        merged.connected = connected;
    }
    if let Some(available) = overrides.available {
        merged.available = available;
    }
    if let Some(use_empty_passphrase) = overrides.use_empty_passphrase {
        merged.use_empty_passphrase = use_empty_passphrase;
    }
    merged
}

/// Index of the acquired record matching `device`'s instance.
fn acquired_index(state: &RegistryState, device: Option<&DeviceRecord>) -> Option<usize> {
    let device = device.filter(|d| d.is_acquired())?;
    let index = find_instance_index(&state.devices, device);
    if index.is_none() {
        debug!("{TAG} no instance {:?} of device {:?} in registry", device.instance, device.id);
    }
    index
}

fn acquired_record<'a>(
    state: &'a mut RegistryState,
    device: &DeviceRecord,
) -> Option<&'a mut DeviceRecord> {
    let index = acquired_index(state, Some(device))?;
    state.devices.get_mut(index)
}

fn connect_device(state: &mut RegistryState, device: &Device) {
    // unacquired/unreadable device, features not read yet
    let Some(features) = device.features.as_ref() else {
        if state.devices.iter().any(|d| d.path == device.path) {
            debug!("{TAG} unacquired device at {:?} already known", device.path);
            return;
        }
        info!("{TAG} unacquired device connected at {:?}", device.path);
        let mut record = DeviceRecord::from_device(device);
        record.connected = true;
        record.available = false;
        record.use_empty_passphrase = true;
        record.ts = now_ms();
        state.devices.push(record);
        return;
    };

    let unlocked = features.is_unlocked();
    let passphrase_protection = features.has_passphrase_protection();

    // None when the device needs an ordinal and none is left
    let fresh = if passphrase_protection {
        new_instance_number(&state.devices, device.id.as_deref()).map(Some)
    } else {
        Some(None)
    }
    .map(|instance| {
        let mut fresh = DeviceRecord::from_device(device);
        fresh.use_empty_passphrase = unlocked && !passphrase_protection;
        fresh.remember = false;
        fresh.connected = true;
        fresh.available = true;
        fresh.auth_confirm = false;
        fresh.instance = instance;
        fresh.ts = now_ms();
        fresh
    });

    // instances of this hardware id, plus unacquired records on this path which
    // are superseded by the acquired one
    let (affected, rest): (Vec<DeviceRecord>, Vec<DeviceRecord>) =
        std::mem::take(&mut state.devices)
            .into_iter()
            .partition(|d| d.is_acquired() && d.id == device.id);
    state.devices = rest
        .into_iter()
        .filter(|d| d.path.is_empty() || d.path != device.path)
        .collect();

    if affected.is_empty() {
        info!("{TAG} device {:?} connected at {:?}", device.id, device.path);
        state.devices.extend(fresh);
        return;
    }

    let mut changed: Vec<DeviceRecord> = affected
        .iter()
        .map(|d| {
            // a passphrase-protected, unlocked device can't serve the standard wallet
            let available = !(d.use_empty_passphrase && unlocked && passphrase_protection);
            let overrides = Overrides {
                connected: Some(true),
                available: Some(available),
                ..Default::default()
            };
            merge(d, device, overrides)
        })
        .collect();

    if !changed.iter().any(|d| d.available) {
        match fresh {
            Some(fresh) => {
                info!("{TAG} no available instance of {:?}, adding one", device.id);
                changed.push(fresh);
            }
            None => warn!("{TAG} no free instance ordinal left for device {:?}", device.id),
        }
    }
    info!("{TAG} device {:?} reattached to {} known instance(s)", device.id, affected.len());
    state.devices.extend(changed);
}

fn change_device(state: &mut RegistryState, device: &Device, extended: Overrides) {
    let Some(features) = device.features.as_ref() else {
        debug!("{TAG} ignoring change of unacquired device at {:?}", device.path);
        return;
    };

    let (affected, others): (Vec<DeviceRecord>, Vec<DeviceRecord>) =
        std::mem::take(&mut state.devices).into_iter().partition(|d| {
            let same_path = !d.path.is_empty() && d.path == device.path;
            d.is_acquired()
                && ((d.connected && (d.id == device.id || same_path))
                    // remembered devices are updated while disconnected in bootloader mode
                    || (d.mode == DeviceMode::Bootloader && d.remember && d.id == device.id))
        });
    state.devices = others;

    let unlocked = features.is_unlocked();
    let passphrase_protection = features.has_passphrase_protection();

    for d in affected {
        let was_unlocked = d.features.as_ref().map_or(true, Features::is_unlocked);
        let overrides = if d.state.is_some() && unlocked {
            // authorized hidden wallets depend on the current passphrase setting
            Overrides {
                available: Some(d.use_empty_passphrase || passphrase_protection),
                ..extended
            }
        } else if d.state.is_none() && !passphrase_protection && !was_unlocked && unlocked {
            // without passphrase protection only the standard wallet exists
            Overrides {
                available: Some(true),
                use_empty_passphrase: Some(true),
                ..extended
            }
        } else {
            extended
        };
        state.devices.push(merge(&d, device, overrides));
    }
}

fn disconnect_device(state: &mut RegistryState, device: &Device) {
    state.devices.retain_mut(|d| {
        if d.path != device.path {
            return true;
        }
        if d.is_acquired() && d.remember {
            debug!("{TAG} keeping remembered device {:?}", d.id);
            d.connected = false;
            d.available = false;
            d.path.clear();
            true
        } else {
            info!("{TAG} device {:?} at {:?} removed", d.id, device.path);
            false
        }
    });
}

fn update_timestamp(state: &mut RegistryState, device: Option<&DeviceRecord>) {
    if let Some(index) = acquired_index(state, device) {
        state.devices[index].ts = now_ms();
    }
}

fn change_passphrase_mode(
    state: &mut RegistryState,
    device: &DeviceRecord,
    hidden: bool,
    always_on_device: bool,
) {
    let Some(index) = acquired_index(state, Some(device)) else { return };
    let current = &state.devices[index];
    let wallet_number = match (hidden, current.wallet_number) {
        (false, _) => None,
        (true, Some(number)) => Some(number),
        (true, None) => match new_wallet_number(&state.devices, current.id.as_deref()) {
            Some(number) => Some(number),
            None => {
                warn!("{TAG} no free wallet number left for device {:?}", current.id);
                return;
            }
        },
    };

    let record = &mut state.devices[index];
    record.use_empty_passphrase = !hidden;
    record.passphrase_on_device = always_on_device;
    record.wallet_number = wallet_number;
    record.ts = now_ms();
}

fn auth_device(state: &mut RegistryState, device: &DeviceRecord, device_state: &str) {
    if let Some(record) = acquired_record(state, device) {
        record.state = Some(device_state.to_string());
        record.auth_failed = false;
    }
}

fn auth_failed(state: &mut RegistryState, device: &DeviceRecord) {
    if let Some(record) = acquired_record(state, device) {
        record.auth_failed = true;
    }
}

fn auth_confirm(state: &mut RegistryState, device: &DeviceRecord, success: bool) {
    if let Some(record) = acquired_record(state, device) {
        record.auth_confirm = !success;
        record.available = success;
    }
}

fn create_instance(state: &mut RegistryState, device: &DeviceRecord) {
    if !device.is_acquired() {
        return;
    }
    let mut instance = device.clone();
    let taken = state
        .devices
        .iter()
        .any(|d| d.is_acquired() && d.id == device.id && d.instance == device.instance);
    if device.instance.is_none() || taken {
        let Some(ordinal) = new_instance_number(&state.devices, device.id.as_deref()) else {
            warn!("{TAG} no free instance ordinal left for device {:?}", device.id);
            return;
        };
        instance.instance = Some(ordinal);
    }
    // the standard wallet stays with the record it was created from
    instance.use_empty_passphrase = false;
    instance.passphrase_on_device = false;
    instance.remember = false;
    instance.state = None;
    instance.wallet_number = None;
    instance.auth_confirm = false;
    instance.ts = now_ms();
    instance.button_requests.clear();
    instance.metadata = DeviceMetadata::default();

    info!("{TAG} created instance {:?} of device {:?}", instance.instance, instance.id);
    state.devices.push(instance);
}

fn remember(
    state: &mut RegistryState,
    device: &DeviceRecord,
    should_remember: bool,
    force_remember: bool,
) {
    if !device.is_acquired() {
        return;
    }
    for d in state.devices.iter_mut().filter(|d| is_selected_instance(device, d)) {
        d.remember = should_remember;
        d.force_remember = force_remember;
    }
}

fn forget(state: &mut RegistryState, device: &DeviceRecord) {
    let Some(index) = acquired_index(state, Some(device)) else { return };
    let has_siblings = !device_instances(device, &state.devices, true).is_empty();

    let record = &mut state.devices[index];
    if record.connected && !has_siblings {
        // the last instance of a connected device stays, reset to the standard wallet
        info!("{TAG} resetting last instance of device {:?}", record.id);
        record.state = None;
        record.wallet_number = None;
        record.use_empty_passphrase = !record
            .features
            .as_ref()
            .map_or(false, Features::has_passphrase_protection);
        record.passphrase_on_device = false;
        record.remember = false;
        record.metadata = DeviceMetadata::default();
    } else {
        info!("{TAG} forgetting instance {:?} of device {:?}", record.instance, record.id);
        state.devices.remove(index);
    }
}

fn add_button_request(
    state: &mut RegistryState,
    device: Option<&DeviceRecord>,
    button_request: Option<&ButtonRequest>,
) {
    let Some(index) = acquired_index(state, device) else { return };
    let record = &mut state.devices[index];
    match button_request {
        Some(request) => record.button_requests.push(request.clone()),
        None => record.button_requests.clear(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extra::DefaultExtraReducers;

    fn features(passphrase_protection: bool, unlocked: bool) -> Features {
        Features {
            passphrase_protection: Some(passphrase_protection),
            unlocked: Some(unlocked),
            major_version: Some(2),
            minor_version: Some(6),
            patch_version: Some(4),
            ..Default::default()
        }
    }

    fn run(state: &RegistryState, action: DeviceAction) -> RegistryState {
        reduce(state, &action, &DefaultExtraReducers)
    }

    #[test]
    fn test_reduce_leaves_input_untouched() {
        let state = RegistryState::default();
        let next = run(&state, DeviceAction::ConnectUnacquired(Device::unacquired("A")));
        assert!(state.devices.is_empty());
        assert_eq!(next.devices.len(), 1);
    }

    #[test]
    fn test_connect_supersedes_unacquired_on_same_path() {
        let state = RegistryState::default();
        let state = run(&state, DeviceAction::ConnectUnacquired(Device::unacquired("A")));
        let state = run(&state, DeviceAction::ConnectUnacquired(Device::unacquired("B")));
        let acquired = Device::acquired("A", "X1", features(false, true));
        let state = run(&state, DeviceAction::Connect(acquired));

        assert_eq!(state.devices.len(), 2);
        assert_eq!(state.devices[0].path, "B");
        assert_eq!(state.devices[1].id.as_deref(), Some("X1"));
    }

    #[test]
    fn test_connect_locked_device_is_not_standard_wallet() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(false, false))),
        );
        let record = &state.devices[0];
        assert!(!record.use_empty_passphrase);
        assert!(record.available);
        assert_eq!(record.instance, None);
    }

    #[test]
    fn test_change_promotes_unlocked_device_to_standard_wallet() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(false, false))),
        );
        let unlocked = Device::acquired("A", "X1", features(false, true));
        let state = run(&state, DeviceAction::DeviceChanged(unlocked));

        let record = &state.devices[0];
        assert!(record.use_empty_passphrase);
        assert!(record.available);
        assert_eq!(record.features.as_ref().and_then(|f| f.unlocked), Some(true));
    }

    #[test]
    fn test_change_with_redacted_features_keeps_known_features() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(false, true))),
        );
        let redacted = Features { unlocked: Some(false), ..Default::default() };
        let state = run(&state, DeviceAction::DeviceChanged(Device::acquired("A", "X1", redacted)));

        let features = state.devices[0].features.as_ref().unwrap();
        assert_eq!(features.major_version, Some(2));
        assert_eq!(features.unlocked, Some(false));
    }

    #[test]
    fn test_change_ignores_unacquired_snapshot() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(false, true))),
        );
        let next = run(&state, DeviceAction::DeviceChanged(Device::unacquired("A")));
        assert_eq!(next, state);
    }

    #[test]
    fn test_auth_flags() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(true, true))),
        );
        let device = state.devices[0].clone();

        let state = run(&state, DeviceAction::AuthFailed(device.clone()));
        assert!(state.devices[0].auth_failed);

        let state =
            run(&state, DeviceAction::AuthDevice { device: device.clone(), state: "s1".into() });
        assert_eq!(state.devices[0].state.as_deref(), Some("s1"));
        assert!(!state.devices[0].auth_failed);

        let state = run(
            &state,
            DeviceAction::ReceiveAuthConfirm { device: device.clone(), success: false },
        );
        assert!(state.devices[0].auth_confirm);
        assert!(!state.devices[0].available);

        let state = run(&state, DeviceAction::ReceiveAuthConfirm { device, success: true });
        assert!(!state.devices[0].auth_confirm);
        assert!(state.devices[0].available);
    }

    #[test]
    fn test_auth_on_unknown_instance_is_noop() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(false, true))),
        );
        let mut stranger = state.devices[0].clone();
        stranger.instance = Some(9);
        let next = run(&state, DeviceAction::AuthDevice { device: stranger, state: "s".into() });
        assert_eq!(next, state);
    }

    #[test]
    fn test_button_requests_queue_and_clear() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(false, true))),
        );
        let device = state.devices[0].clone();
        let state = run(
            &state,
            DeviceAction::AddButtonRequest {
                device: Some(device.clone()),
                button_request: Some(ButtonRequest::new("ButtonRequest_ProtectCall")),
            },
        );
        let state = run(
            &state,
            DeviceAction::AddButtonRequest {
                device: Some(device.clone()),
                button_request: Some(ButtonRequest::new("ButtonRequest_ConfirmOutput")),
            },
        );
        assert_eq!(state.devices[0].button_requests.len(), 2);
        assert_eq!(state.devices[0].button_requests[1].code, "ButtonRequest_ConfirmOutput");

        let state = run(
            &state,
            DeviceAction::AddButtonRequest { device: Some(device), button_request: None },
        );
        assert!(state.devices[0].button_requests.is_empty());
    }

    #[test]
    fn test_remember_sets_and_clears_force_flag() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(false, true))),
        );
        let device = state.devices[0].clone();
        let state = run(
            &state,
            DeviceAction::RememberDevice {
                device: device.clone(),
                remember: true,
                force_remember: true,
            },
        );
        assert!(state.devices[0].remember && state.devices[0].force_remember);

        let state = run(
            &state,
            DeviceAction::RememberDevice { device, remember: true, force_remember: false },
        );
        assert!(state.devices[0].remember);
        assert!(!state.devices[0].force_remember);
    }

    #[test]
    fn test_selection_is_a_snapshot() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(false, true))),
        );
        let device = state.devices[0].clone();
        let state = run(&state, DeviceAction::SelectDevice(Some(device.clone())));
        let state = run(&state, DeviceAction::AuthDevice { device, state: "s1".into() });

        assert_eq!(state.devices[0].state.as_deref(), Some("s1"));
        assert_eq!(state.selected_device.as_ref().unwrap().state, None);

        let state = run(&state, DeviceAction::RequestDeviceReconnect);
        assert!(state.selected_device.as_ref().unwrap().reconnect_requested);
        assert!(!state.devices[0].reconnect_requested);

        let state = run(&state, DeviceAction::UpdateSelectedDevice(None));
        assert!(state.selected_device.is_none());
    }

    #[test]
    fn test_create_instance_clears_session() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(true, true))),
        );
        let mut device = state.devices[0].clone();
        device.state = Some("s1".into());
        device.wallet_number = Some(1);
        device.remember = true;
        device.button_requests.push(ButtonRequest::new("ButtonRequest_Other"));

        let state = run(&state, DeviceAction::CreateDeviceInstance(device));
        assert_eq!(state.devices.len(), 2);
        let created = &state.devices[1];
        assert_eq!(created.instance, Some(2));
        assert_eq!(created.state, None);
        assert_eq!(created.wallet_number, None);
        assert!(!created.remember);
        assert!(created.button_requests.is_empty());
    }

    #[test]
    fn test_create_instance_never_adds_standard_wallet() {
        let state = run(
            &RegistryState::default(),
            DeviceAction::Connect(Device::acquired("A", "X1", features(true, true))),
        );
        let device = state.devices[0].clone();
        let state = run(
            &state,
            DeviceAction::UpdatePassphraseMode { device, hidden: false, always_on_device: false },
        );
        let standard = state.devices[0].clone();
        assert!(standard.use_empty_passphrase && standard.available);

        let state = run(&state, DeviceAction::CreateDeviceInstance(standard));
        assert_eq!(state.devices.len(), 2);
        assert!(!state.devices[1].use_empty_passphrase);
        let standard_count = state
            .devices
            .iter()
            .filter(|d| d.id.as_deref() == Some("X1") && d.use_empty_passphrase && d.available)
            .count();
        assert_eq!(standard_count, 1);
    }

    fn exhausted() -> RegistryState {
        let device = Device::acquired("", "X1", features(true, true));
        let mut record = DeviceRecord::from_device(&device);
        record.instance = Some(u32::MAX);
        record.wallet_number = Some(u32::MAX);
        record.use_empty_passphrase = false;
        record.remember = true;
        run(&RegistryState::default(), DeviceAction::StorageLoad { devices: vec![record] })
    }

    #[test]
    fn test_create_instance_without_free_ordinal_is_noop() {
        let state = exhausted();
        let device = state.devices[0].clone();
        let next = run(&state, DeviceAction::CreateDeviceInstance(device));
        assert_eq!(next, state);
    }

    #[test]
    fn test_connect_without_free_ordinal_keeps_known_instances() {
        let state = exhausted();
        let mut locked = state.devices[0].clone();
        locked.use_empty_passphrase = true;
        let state = RegistryState { devices: vec![locked], ..state };

        // the only record is the standard wallet, unusable on a passphrase-protected device
        let device = Device::acquired("A", "X1", features(true, true));
        let next = run(&state, DeviceAction::Connect(device));
        assert_eq!(next.devices.len(), 1);
        assert!(next.devices[0].connected);
        assert!(!next.devices[0].available);
    }

    #[test]
    fn test_passphrase_mode_without_free_wallet_number_is_noop() {
        let state = exhausted();
        let mut second = state.devices[0].clone();
        second.instance = Some(1);
        second.wallet_number = None;
        let mut devices = state.devices.clone();
        devices.push(second.clone());
        let state = RegistryState { devices, ..state };

        let action = DeviceAction::UpdatePassphraseMode {
            device: second,
            hidden: true,
            always_on_device: true,
        };
        let next = run(&state, action);
        assert_eq!(next, state);
    }
}
