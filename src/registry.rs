use crate::actions::DeviceAction;
use crate::device::DeviceRecord;
use crate::extra::{DefaultExtraReducers, ExtraReducers};
use crate::reducer::{reduce, RegistryState};

/// Owns a [`RegistryState`] and replaces it on every dispatched event.
///
/// Events must be dispatched one at a time; the registry does no locking of
/// its own. Wrap it in a mutex if several tasks feed it.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry<E: ExtraReducers = DefaultExtraReducers> {
    state: RegistryState,
    extra: E,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: ExtraReducers> DeviceRegistry<E> {
    pub fn with_extra_reducers(extra: E) -> Self {
        Self { state: RegistryState::default(), extra }
    }

    /// Starts from a previously captured state, e.g. one restored by the host app.
    pub fn from_state(state: RegistryState, extra: E) -> Self {
        Self { state, extra }
    }

    pub fn dispatch(&mut self, action: DeviceAction) {
        self.state = reduce(&self.state, &action, &self.extra);
    }

    pub fn dispatch_all(&mut self, actions: impl IntoIterator<Item = DeviceAction>) {
        for action in actions {
            self.dispatch(action);
        }
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.state.devices
    }

    pub fn into_state(self) -> RegistryState {
        self.state
    }
}
