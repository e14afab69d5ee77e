//! Reconciliation of observed device state against configuration
//!
//! Each tick lists the devices usbipd currently reports, compares them with
//! the snapshot taken on the first successful listing and with the configured
//! entries, and attaches whatever should be bound but is not. Ticks only ever
//! bind; unbinding happens solely through the startup detach-all.
//!
//! Two passes decide what to bind:
//!
//! 1. New-device pass (only with `auto_bind_new_devices`): a device absent
//!    from the startup snapshot should be bound, unless the last configured
//!    entry with the same hardware id says otherwise. Devices bound here are
//!    marked attached in the live set.
//! 2. Configured pass: every non-placeholder entry with `attached = true`
//!    binds each live device with its hardware id that is still unattached.

use crate::config::{BinderConfig, PLACEHOLDER_DEVICE_NAME};
use crate::usbipd::SharingTool;
use protocol::{BusId, DeviceMap, parse_listing};
use tracing::debug;

/// Why a device is being bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindReason {
    /// Decided by the new-device pass
    NewDevice,
    /// Decided by the configured pass
    Configured,
}

/// One attach to issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAction {
    pub bus_id: BusId,
    /// Device name used in log lines
    pub label: String,
    pub reason: BindReason,
}

/// Outcome of a single tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Number of devices in the listing
    pub devices: usize,
    /// Whether this tick captured the startup snapshot
    pub captured_snapshot: bool,
    /// Attaches issued, in order
    pub actions: Vec<BindAction>,
}

/// Holds the startup snapshot across ticks
#[derive(Debug, Default)]
pub struct Reconciler {
    snapshot: Option<DeviceMap>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices present when watching began, once captured
    pub fn snapshot(&self) -> Option<&DeviceMap> {
        self.snapshot.as_ref()
    }

    /// Run one reconciliation tick
    ///
    /// Fails only when the listing cannot be parsed; the snapshot is not
    /// captured from a failed listing.
    pub async fn tick<T: SharingTool>(
        &mut self,
        tool: &T,
        config: &BinderConfig,
    ) -> common::Result<TickReport> {
        let raw = tool.list().await;
        for line in raw.split('\n') {
            debug!("{}", line.trim_end());
        }
        let mut live = parse_listing(&raw)?;

        let captured_snapshot = self.snapshot.is_none();
        let snapshot = self.snapshot.get_or_insert_with(|| live.clone());

        let actions = plan_bindings(snapshot, &mut live, config);
        for action in &actions {
            debug!("{:?} bind for {}", action.reason, action.bus_id);
            tool.attach(&action.bus_id, &action.label);
        }

        Ok(TickReport {
            devices: live.len(),
            captured_snapshot,
            actions,
        })
    }
}

/// Decide which live devices to attach
///
/// Devices bound by the new-device pass are marked attached in `live` so the
/// configured pass does not bind them a second time.
pub fn plan_bindings(
    snapshot: &DeviceMap,
    live: &mut DeviceMap,
    config: &BinderConfig,
) -> Vec<BindAction> {
    let mut actions = Vec::new();

    if config.auto_bind_new_devices {
        for (bus_id, device) in live.iter_mut() {
            let mut should_bind = !snapshot.contains_key(bus_id);
            if let Some(entry) = config
                .devices
                .iter()
                .rev()
                .find(|entry| entry.hw_id == device.hw_id)
            {
                should_bind = entry.attached;
            }

            if !device.attached && should_bind {
                actions.push(BindAction {
                    bus_id: bus_id.clone(),
                    label: device.display_name().to_string(),
                    reason: BindReason::NewDevice,
                });
                device.attached = true;
            }
        }
    }

    for entry in config
        .devices
        .iter()
        .filter(|entry| entry.name != PLACEHOLDER_DEVICE_NAME && entry.attached)
    {
        for device in live
            .values()
            .filter(|device| device.hw_id == entry.hw_id && !device.attached)
        {
            actions.push(BindAction {
                bus_id: device.bus_id.clone(),
                label: entry.display_name().to_string(),
                reason: BindReason::Configured,
            });
        }
    }

    actions
}
