//! usbipd text protocol for wsl-usb-autobinder
//!
//! This crate defines the contract with the external `usbipd` tool: the
//! device records it reports, the parser for its `wsl list` output, and the
//! argument vectors for every verb the binder issues. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use protocol::{BusId, UsbipdCommand, parse_listing};
//!
//! let listing = "1-4  046d:c52b  Logitech USB Input Device  Not attached\n";
//! let devices = parse_listing(listing).unwrap();
//!
//! for device in devices.values() {
//!     if !device.attached {
//!         let cmd = UsbipdCommand::Attach { bus_id: device.bus_id.clone() };
//!         assert_eq!(cmd.args(None), ["wsl", "attach", "--busid", "1-4"]);
//!     }
//! }
//! # assert!(devices.contains_key(&BusId::from("1-4")));
//! ```

pub mod command;
pub mod error;
pub mod listing;
pub mod types;

pub use command::{USBIPD_PROGRAM, UsbipdCommand};
pub use error::{ListingError, Result};
pub use listing::{
    ATTACHED, NOT_ATTACHED, collapse_spaces, is_device_row, parse_device_row, parse_listing,
};
pub use types::{BusId, Device, DeviceMap, HwId};
