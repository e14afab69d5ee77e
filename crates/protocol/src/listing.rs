//! Parsing of `usbipd wsl list` output
//!
//! The listing is column-aligned text. A line is treated as a device row only
//! if it contains a hyphen, a colon and a space; everything else (headers,
//! blank lines, GUID sections) is dropped. Device rows are read positionally
//! after collapsing runs of spaces:
//!
//! ```text
//! <busid> <vid:pid> <free text name> <Attached ...|Not attached>
//! ```
//!
//! The matching is substring based and deliberately loose so that it tracks
//! usbipd's column layout exactly as it always has. A hardware id or device
//! name that itself contains `Attached` will be misread; that limitation is
//! kept as-is.
//!
//! # Example
//!
//! ```
//! use protocol::{BusId, parse_listing};
//!
//! let listing = "BUSID  VID:PID    DEVICE          STATE\n\
//!                1-1.2  067b:2303  My Device       Attached\n";
//! let devices = parse_listing(listing).unwrap();
//! let device = &devices[&BusId::from("1-1.2")];
//! assert_eq!(device.name, "My Device ");
//! assert!(device.attached);
//! ```

use crate::error::{ListingError, Result};
use crate::types::{BusId, Device, DeviceMap, HwId};

/// Status phrase of a row bound to the guest
pub const ATTACHED: &str = "Attached";

/// Status phrase of a row not bound to the guest
pub const NOT_ATTACHED: &str = "Not attached";

/// Check whether a raw line looks like a device row
pub fn is_device_row(line: &str) -> bool {
    line.contains('-') && line.contains(':') && line.contains(' ')
}

/// Collapse every run of spaces into a single space
///
/// Only the space character is collapsed; tabs and carriage returns are kept.
pub fn collapse_spaces(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut previous_space = false;
    for c in line.chars() {
        if c == ' ' {
            if previous_space {
                continue;
            }
            previous_space = true;
        } else {
            previous_space = false;
        }
        out.push(c);
    }
    out
}

/// Parse a single device row
///
/// The caller is expected to have checked the row with [`is_device_row`].
/// Fails only when nothing follows the hardware id, in which case the name
/// cannot be located.
pub fn parse_device_row(line: &str) -> Result<Device> {
    let row = collapse_spaces(line);

    let mut fields = row.split(' ');
    let bus_id = fields.next().unwrap_or_default();
    let hw_id = fields.next().unwrap_or_default();

    let attached = row.contains(ATTACHED);

    let separator = format!("{} ", hw_id);
    let after_hw_id = row
        .split(separator.as_str())
        .nth(1)
        .ok_or_else(|| ListingError::MissingName {
            hw_id: hw_id.to_string(),
            line: line.to_string(),
        })?;

    let status = if attached { ATTACHED } else { NOT_ATTACHED };
    let name = after_hw_id.split(status).next().unwrap_or_default();

    Ok(Device {
        bus_id: BusId(bus_id.to_string()),
        hw_id: HwId(hw_id.to_string()),
        name: name.to_string(),
        attached,
    })
}

/// Parse the full text of a listing into devices keyed by bus id
///
/// Lines are split on `\n` only, so a trailing `\r` from Windows line endings
/// stays on the line (it never reaches the name, which ends at the status
/// phrase). When two rows share a bus id the later one wins.
pub fn parse_listing(text: &str) -> Result<DeviceMap> {
    let mut devices = DeviceMap::new();
    for line in text.split('\n').filter(|line| is_device_row(line)) {
        let device = parse_device_row(line)?;
        devices.insert(device.bus_id.clone(), device);
    }
    Ok(devices)
}
