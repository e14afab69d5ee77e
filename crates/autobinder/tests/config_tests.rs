//! Integration tests for configuration handling
//!
//! Drives the `wsl-usb-autobinder` binary to check:
//! - Default configuration written by --save-config (TOML and JSON)
//! - First-run creation of a missing configuration file
//! - Rejection of invalid configuration before anything runs
//!
//! Run with: `cargo test -p autobinder --test config_tests`

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn binder(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wsl-usb-autobinder"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run wsl-usb-autobinder")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp path is not UTF-8")
}

mod save_config {
    use super::*;

    #[test]
    fn test_save_default_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let output = binder(&["--save-config", "--config", path_arg(&path)]);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration saved to"));

        let config: toml::Value = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.get("distribution").unwrap().as_str().unwrap(), "");
        assert!(!config.get("debug").unwrap().as_bool().unwrap());
        assert!(
            config
                .get("unbind_all_at_startup")
                .unwrap()
                .as_bool()
                .unwrap()
        );
        assert!(
            config
                .get("auto_bind_new_devices")
                .unwrap()
                .as_bool()
                .unwrap()
        );

        let devices = config.get("devices").unwrap().as_array().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].get("bus_id").unwrap().as_str().unwrap(), "1-1.2");
        assert_eq!(
            devices[0].get("hw_id").unwrap().as_str().unwrap(),
            "067b:2303"
        );
        assert_eq!(
            devices[0].get("name").unwrap().as_str().unwrap(),
            "Example Device"
        );
        assert!(!devices[0].get("attached").unwrap().as_bool().unwrap());

        let timing = config.get("timing").unwrap();
        assert_eq!(
            timing.get("poll_interval_ms").unwrap().as_integer().unwrap(),
            1000
        );
        assert_eq!(
            timing
                .get("startup_grace_secs")
                .unwrap()
                .as_integer()
                .unwrap(),
            5
        );
    }

    #[test]
    fn test_save_default_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let output = binder(&["--save-config", "--config", path_arg(&path)]);
        assert!(output.status.success());

        let config: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config["devices"][0]["hw_id"], "067b:2303");
        assert_eq!(config["unbind_all_at_startup"], true);
        assert_eq!(config["timing"]["poll_interval_ms"], 1000);
    }
}

mod invalid_config {
    use super::*;

    const BAD_HW_ID: &str = r#"
[[devices]]
bus_id = "1-1"
hw_id = "not-a-hw-id"
name = "Broken"
attached = true
"#;

    #[test]
    fn test_invalid_hw_id_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, BAD_HW_ID).unwrap();

        let output = binder(&["--config", path_arg(&path), "--list-devices"]);
        assert!(!output.status.success());
        assert_ne!(output.status.code(), Some(2));

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Failed to load configuration"));
    }

    #[test]
    fn test_unparseable_file_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "debug = maybe").unwrap();

        let output = binder(&["--config", path_arg(&path), "--list-devices"]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to parse config file"));
    }

    #[test]
    fn test_camel_case_json_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "devices": [{"busId": "1-1.2", "hwId": "067b:2303", "name": "Serial", "attached": true}],
                "distribution": "",
                "debug": false,
                "unbindAllAtStartup": false,
                "autoBindNewDevices": true
            }"#,
        )
        .unwrap();

        // A missing usbipd yields an empty listing, which is not an error.
        let output = binder(&[
            "--config",
            path_arg(&path),
            "--usbipd",
            "/nonexistent/usbipd",
            "--list-devices",
        ]);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("No USB devices found."));
    }
}

mod hw_id_only_entries {
    use super::*;

    #[test]
    fn test_json_entry_without_bus_id_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"devices": [{"hwId": "067b:2303", "attached": true}]}"#).unwrap();

        let output = binder(&[
            "--config",
            path_arg(&path),
            "--usbipd",
            "/nonexistent/usbipd",
            "--list-devices",
        ]);
        assert!(output.status.success());
    }

    #[test]
    fn test_toml_entry_without_bus_id_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[[devices]]\nhw_id = \"067b:2303\"\nattached = true\n").unwrap();

        let output = binder(&[
            "--config",
            path_arg(&path),
            "--usbipd",
            "/nonexistent/usbipd",
            "--list-devices",
        ]);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration file located at"));
    }
}

mod first_run {
    use super::*;

    #[test]
    fn test_missing_config_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wsl-usb-autobinder").join("config.toml");

        let output = binder(&[
            "--config",
            path_arg(&path),
            "--usbipd",
            "/nonexistent/usbipd",
            "--list-devices",
        ]);
        assert!(output.status.success());
        assert!(path.exists());
        assert!(String::from_utf8_lossy(&output.stdout).contains("Created default configuration at"));

        let config: toml::Value = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(config.get("devices").is_some());
    }
}
