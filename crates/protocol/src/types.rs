//! USB device type definitions
//!
//! This module defines the device records exchanged with usbipd: the
//! port-relative bus id, the stable hardware id, and the device record
//! itself as reported by a listing or declared in configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Host-bus-relative device identifier (e.g. `1-1.2`)
///
/// Identifies a device by the physical port it is plugged into. The value
/// changes when the device is moved to a different port, so it is only used
/// for presence comparisons, never as a policy key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(pub String);

/// Hardware identifier in `vendor:product` form (e.g. `067b:2303`)
///
/// Stable across reconnects and port changes. User-facing configuration is
/// keyed on this value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HwId(pub String);

impl BusId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl HwId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for HwId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BusId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&str> for HwId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A USB device as reported by `usbipd wsl list` or declared in configuration
///
/// `name` is the free-text description squeezed between the hardware id and
/// the status phrase of a listing row. It is kept exactly as extracted,
/// including the trailing space that precedes the status phrase.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Device {
    /// Port-relative identifier, empty when a configured entry omits it
    #[serde(default, alias = "busId")]
    pub bus_id: BusId,
    /// Vendor:product identifier
    #[serde(default, alias = "hwId")]
    pub hw_id: HwId,
    /// Free-text description
    #[serde(default)]
    pub name: String,
    /// Whether the device is currently bound to the guest
    #[serde(default)]
    pub attached: bool,
}

impl Device {
    /// Create a device record
    pub fn new(
        bus_id: impl Into<BusId>,
        hw_id: impl Into<HwId>,
        name: impl Into<String>,
        attached: bool,
    ) -> Self {
        Self {
            bus_id: bus_id.into(),
            hw_id: hw_id.into(),
            name: name.into(),
            attached,
        }
    }

    /// Name with the surrounding padding removed, for display
    pub fn display_name(&self) -> &str {
        self.name.trim()
    }
}

/// Devices keyed by bus id, ordered by bus id
pub type DeviceMap = BTreeMap<BusId, Device>;
