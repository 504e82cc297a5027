use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Progress of account discovery for one device state. Ordered: a status
/// compares lower than every status that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryStatus {
    Idle = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
    Completed = 5,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    pub device_state: String,
    pub status: DiscoveryStatus,
    #[serde(default)]
    pub auth_confirm: bool,
}

/// Read access to the discovery subsystem, keyed by authenticated device state.
#[cfg_attr(test, mockall::automock)]
pub trait DiscoveryLookup {
    fn discovery_by_device_state(&self, device_state: &str) -> Option<Discovery>;
}

impl DiscoveryLookup for [Discovery] {
    fn discovery_by_device_state(&self, device_state: &str) -> Option<Discovery> {
        self.iter().find(|d| d.device_state == device_state).cloned()
    }
}

impl DiscoveryLookup for Vec<Discovery> {
    fn discovery_by_device_state(&self, device_state: &str) -> Option<Discovery> {
        self.as_slice().discovery_by_device_state(device_state)
    }
}

impl DiscoveryLookup for HashMap<String, Discovery> {
    fn discovery_by_device_state(&self, device_state: &str) -> Option<Discovery> {
        self.get(device_state).cloned()
    }
}
