//! Headless device registry for hardware wallets – no transport/UI code.
//!
//! Keeps the list of known device instances (connected, remembered, and
//! passphrase-derived siblings of the same physical device) and reconciles
//! transport lifecycle events against it. [`reduce`] is a pure function over
//! [`RegistryState`]; [`DeviceRegistry`] owns a state for callers that just
//! want to dispatch events.

pub mod actions;
pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod extra;
pub mod features;
pub mod instances;
pub mod logging;
pub mod networks;
pub mod reducer;
pub mod registry;
pub mod selectors;
pub mod utils;

pub use actions::DeviceAction;
pub use device::{ButtonRequest, Device, DeviceMetadata, DeviceRecord, DeviceStatus};
pub use error::RegistryError;
pub use extra::{DefaultExtraReducers, ExtraReducers};
pub use features::Features;
pub use reducer::{reduce, RegistryState};
pub use registry::DeviceRegistry;
