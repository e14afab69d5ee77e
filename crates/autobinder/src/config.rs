//! Binder configuration management
//!
//! The configuration is a single TOML file (JSON is accepted when the file
//! name ends in `.json`). A missing file is created with defaults on first
//! run, and keys missing from an existing file take their defaults.

use anyhow::{Context, Result, anyhow};
use protocol::{Device, HwId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the placeholder entry written into a fresh configuration
///
/// The configuration binding pass ignores entries with this name.
pub const PLACEHOLDER_DEVICE_NAME: &str = "Example Device";

/// Directory under the home directory holding the configuration
const CONFIG_DIR_NAME: &str = "wsl-usb-autobinder";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file written by earlier releases
const LEGACY_CONFIG_FILE_NAME: &str = "config.json";

/// Whether `BinderConfig::load` read an existing file or wrote the defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    Loaded,
    Created,
}

/// Top-level binder configuration
///
/// # Example Configuration
/// ```toml
/// distribution = "Ubuntu"
/// debug = false
/// unbind_all_at_startup = true
/// auto_bind_new_devices = true
///
/// [[devices]]
/// bus_id = "1-1.2"
/// hw_id = "067b:2303"
/// name = "Serial adapter"
/// attached = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Target WSL distribution, empty for the default one
    pub distribution: String,
    /// Log every tool output line and exit code
    pub debug: bool,
    /// Detach every device once before the loop starts
    #[serde(alias = "unbindAllAtStartup")]
    pub unbind_all_at_startup: bool,
    /// Attach devices that appear after the loop started
    #[serde(alias = "autoBindNewDevices")]
    pub auto_bind_new_devices: bool,
    /// Desired state per hardware id
    pub devices: Vec<Device>,
    /// Loop timing
    pub timing: TimingSettings,
}

/// Timing of the reconciliation loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Period between reconciliation ticks in milliseconds
    #[serde(default = "TimingSettings::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Wait after the startup detach-all before the first tick, in seconds
    #[serde(default = "TimingSettings::default_startup_grace_secs")]
    pub startup_grace_secs: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: Self::default_poll_interval_ms(),
            startup_grace_secs: Self::default_startup_grace_secs(),
        }
    }
}

impl TimingSettings {
    fn default_poll_interval_ms() -> u64 {
        1000
    }

    fn default_startup_grace_secs() -> u64 {
        5
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_secs(self.startup_grace_secs)
    }
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            distribution: String::new(),
            debug: false,
            unbind_all_at_startup: true,
            auto_bind_new_devices: true,
            devices: vec![Device::new(
                "1-1.2",
                "067b:2303",
                PLACEHOLDER_DEVICE_NAME,
                false,
            )],
            timing: TimingSettings::default(),
        }
    }
}

/// On-disk encoding of the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from the file extension, TOML unless it is `.json`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl BinderConfig {
    /// Load configuration, creating it with defaults if the file is missing
    ///
    /// Runs before logging is set up, so the caller reports the origin.
    pub fn load(path: &Path) -> Result<(Self, ConfigOrigin)> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok((config, ConfigOrigin::Created));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content, ConfigFormat::from_path(path))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok((config, ConfigOrigin::Loaded))
    }

    /// Parse configuration text in the given format without validating it
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        Ok(config)
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).context("Failed to serialize configuration")?
            }
            ConfigFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize configuration")?
            }
        };

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        let dir = match dirs::home_dir() {
            Some(home_dir) => home_dir.join(CONFIG_DIR_NAME),
            None => PathBuf::from(CONFIG_DIR_NAME),
        };
        Self::path_in(&dir)
    }

    /// Pick the configuration file inside `dir`
    ///
    /// An existing `config.json` is used when there is no `config.toml`.
    fn path_in(dir: &Path) -> PathBuf {
        let toml_path = dir.join(CONFIG_FILE_NAME);
        let legacy_path = dir.join(LEGACY_CONFIG_FILE_NAME);
        if !toml_path.exists() && legacy_path.is_file() {
            legacy_path
        } else {
            toml_path
        }
    }

    /// Distribution to pass to usbipd, `None` when unset
    pub fn distribution(&self) -> Option<&str> {
        Some(self.distribution.as_str()).filter(|name| !name.is_empty())
    }

    /// Log level implied by the debug flag
    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.distribution.chars().any(char::is_whitespace) {
            return Err(anyhow!(
                "Invalid distribution '{}', must not contain whitespace",
                self.distribution
            ));
        }

        if self.timing.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be greater than 0"));
        }

        // An entry without a hardware id never matches a device
        for device in self.devices.iter().filter(|d| !d.hw_id.as_str().is_empty()) {
            Self::validate_hw_id(&device.hw_id)?;
        }

        Ok(())
    }

    /// Validate a hardware id (VID:PID, hex without prefix)
    fn validate_hw_id(hw_id: &HwId) -> Result<()> {
        let parts: Vec<&str> = hw_id.as_str().split(':').collect();
        if parts.len() != 2 {
            return Err(anyhow!(
                "Invalid hw_id '{}', expected VID:PID (e.g., '067b:2303')",
                hw_id
            ));
        }

        for (part, name) in parts.iter().zip(["VID", "PID"]) {
            if part.is_empty() || part.len() > 4 {
                return Err(anyhow!(
                    "Invalid {} in hw_id '{}', must be 1-4 hex digits",
                    name,
                    hw_id
                ));
            }
            u16::from_str_radix(part, 16).map_err(|_| {
                anyhow!("Invalid {} in hw_id '{}', not a valid hex number", name, hw_id)
            })?;
        }

        Ok(())
    }
}

/// Expand a user-supplied path, resolving a leading `~`
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}
