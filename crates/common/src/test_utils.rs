//! Test utilities for wsl-usb-autobinder
//!
//! Provides builders for fake `usbipd wsl list` output and helpers for async
//! tests.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{create_mock_device, create_mock_listing};
//! use protocol::parse_listing;
//!
//! let device = create_mock_device(1, false);
//! let listing = create_mock_listing(&[device.clone()]);
//! let parsed = parse_listing(&listing).unwrap();
//! assert_eq!(parsed[&device.bus_id], device);
//! ```

use protocol::{ATTACHED, Device, NOT_ATTACHED};
use std::future::Future;
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Column header printed by `usbipd wsl list`
pub const LISTING_HEADER: &str =
    "BUSID  VID:PID    DEVICE                                                        STATE";

/// Create a mock device as it would come back from parsing
///
/// The bus id is `1-<id>`, the hardware id `1000+id:2000+id` and the name
/// carries the single trailing space that parsing leaves before the status.
///
/// # Example
/// ```
/// use common::test_utils::create_mock_device;
///
/// let device = create_mock_device(3, true);
/// assert_eq!(device.bus_id.as_str(), "1-3");
/// assert_eq!(device.hw_id.as_str(), "1003:2003");
/// ```
pub fn create_mock_device(id: u16, attached: bool) -> Device {
    Device::new(
        format!("1-{}", id).as_str(),
        format!("{:04x}:{:04x}", 0x1000 + id, 0x2000 + id).as_str(),
        format!("Test Device {} ", id),
        attached,
    )
}

/// Render one device as a column-aligned listing row
pub fn listing_row(device: &Device) -> String {
    let status = if device.attached {
        ATTACHED
    } else {
        NOT_ATTACHED
    };
    format!(
        "{:<7}{:<11}{:<62}{}",
        device.bus_id.as_str(),
        device.hw_id.as_str(),
        device.name.trim_end(),
        status
    )
}

/// Render devices as a full listing with header and CRLF line endings
pub fn create_mock_listing(devices: &[Device]) -> String {
    let mut listing = String::from(LISTING_HEADER);
    listing.push_str("\r\n");
    for device in devices {
        listing.push_str(&listing_row(device));
        listing.push_str("\r\n");
    }
    listing
}

/// Timeout wrapper for async tests
///
/// Wraps an async operation with a timeout to prevent tests from hanging.
///
/// # Example
/// ```ignore
/// use common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// #[tokio::test]
/// async fn test_with_timeout() {
///     let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await.unwrap();
///     assert_eq!(result, 42);
/// }
/// ```
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test times out
#[derive(Debug)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Test timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}
