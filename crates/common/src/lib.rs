//! Common utilities for wsl-usb-autobinder
//!
//! This crate provides shared functionality for the binder: error handling,
//! logging setup, and the registry of spawned external tool processes.

pub mod error;
pub mod logging;
pub mod process;
pub mod test_utils;

pub use error::{Error, Result};
pub use logging::setup_logging;
pub use process::{ProcessRegistry, ToolOutput, ToolTask};
