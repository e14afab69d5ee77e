//! wsl-usb-autobinder
//!
//! Keeps USB devices bound to WSL according to a configuration file by
//! driving the `usbipd` command-line tool on a fixed interval.

mod config;
mod reconciler;
mod scheduler;
mod usbipd;

use anyhow::{Context, Result};
use clap::Parser;
use common::{ProcessRegistry, setup_logging};
use config::{BinderConfig, ConfigOrigin};
use protocol::{BusId, USBIPD_PROGRAM, UsbipdCommand, parse_listing};
use scheduler::Scheduler;
use tokio::signal;
use tracing::{error, info, warn};
use usbipd::{SharingTool, Usbipd};

/// Exit code after a shutdown signal
const EXIT_INTERRUPTED: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "wsl-usb-autobinder")]
#[command(
    author,
    version,
    about = "Automatically bind USB devices to WSL using usbipd"
)]
#[command(long_about = "
Watches the devices reported by `usbipd wsl list` and attaches them to WSL
according to a configuration file. Devices plugged in after startup are
attached automatically; devices listed in the configuration with
`attached = true` are attached whenever they appear.

EXAMPLES:
    # Run with default config
    wsl-usb-autobinder

    # Run with custom config
    wsl-usb-autobinder --config ~/binder.toml

    # List devices without starting the loop
    wsl-usb-autobinder --list-devices

    # Attach a single device and exit
    wsl-usb-autobinder --attach 1-1.2

CONFIGURATION:
    The configuration is read from the path given with --config, or from
    ~/wsl-usb-autobinder/config.toml (or an existing config.json there).
    It is created with defaults if missing.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Save default configuration to the config path and exit
    #[arg(long)]
    save_config: bool,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Attach one device by bus id and exit
    #[arg(long, value_name = "BUSID", conflicts_with = "detach")]
    attach: Option<String>,

    /// Detach one device by bus id and exit
    #[arg(long, value_name = "BUSID")]
    detach: Option<String>,

    /// Path or name of the usbipd executable
    #[arg(long, value_name = "PATH", default_value = USBIPD_PROGRAM)]
    usbipd: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .as_deref()
        .map(config::expand_path)
        .unwrap_or_else(BinderConfig::default_path);

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        BinderConfig::default()
            .save(&config_path)
            .context("Failed to save configuration")?;
        println!("Configuration saved to: {}", config_path.display());
        return Ok(());
    }

    let (config, origin) =
        BinderConfig::load(&config_path).context("Failed to load configuration")?;

    // Use CLI log level if specified, otherwise derive it from the debug flag
    let log_level = args.log_level.as_deref().unwrap_or(config.log_level());
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("wsl-usb-autobinder v{}", env!("CARGO_PKG_VERSION"));
    match origin {
        ConfigOrigin::Created => {
            info!("Created default configuration at {}", config_path.display())
        }
        ConfigOrigin::Loaded => info!("Configuration file located at {}", config_path.display()),
    }

    let registry = ProcessRegistry::new();
    let usbipd = Usbipd::new(
        args.usbipd.as_str(),
        config.distribution().map(str::to_string),
        registry.clone(),
    );

    if args.list_devices {
        return list_devices_mode(&usbipd).await;
    }
    if let Some(bus_id) = args.attach {
        return run_single(&usbipd, UsbipdCommand::Attach { bus_id: BusId(bus_id) }).await;
    }
    if let Some(bus_id) = args.detach {
        return run_single(&usbipd, UsbipdCommand::Detach { bus_id: BusId(bus_id) }).await;
    }

    let mut scheduler = Scheduler::new(usbipd, config);
    tokio::select! {
        _ = scheduler.run() => {}
        name = shutdown_signal() => info!("Received {}, exiting...", name),
    }

    let killed = registry.shutdown().await;
    if killed > 0 {
        info!("Killed {} running usbipd process(es)", killed);
    }

    std::process::exit(EXIT_INTERRUPTED);
}

/// List USB devices and exit
async fn list_devices_mode(usbipd: &Usbipd) -> Result<()> {
    info!("Listing USB devices...");

    let listing = usbipd.list().await;
    let devices = parse_listing(&listing).context("Failed to parse usbipd output")?;

    if devices.is_empty() {
        println!("No USB devices found.");
    } else {
        println!("Found {} USB device(s):\n", devices.len());
        for device in devices.values() {
            println!(
                "  [{}] {} - {}",
                device.bus_id,
                device.hw_id,
                device.display_name()
            );
            println!(
                "      {}",
                if device.attached {
                    "Attached"
                } else {
                    "Not attached"
                }
            );
        }
    }

    Ok(())
}

/// Run one usbipd command, print its output and exit
async fn run_single(usbipd: &Usbipd, command: UsbipdCommand) -> Result<()> {
    info!("Running {}", command);

    let output = usbipd
        .run(&command)
        .await
        .with_context(|| format!("Failed to run {}", command))?;

    for line in output.stdout_lines() {
        println!("{}", line);
    }
    for line in output.stderr_lines() {
        eprintln!("{}", line);
    }

    if output.success() {
        info!("{} completed", command.verb());
    } else {
        warn!("{} exited with code {:?}", command.verb(), output.status);
    }

    Ok(())
}

/// Wait for a shutdown signal and return its name
///
/// If signals cannot be listened for, this logs and never resolves.
async fn shutdown_signal() -> &'static str {
    match wait_for_signal().await {
        Ok(name) => name,
        Err(e) => {
            error!("Error waiting for shutdown signal: {}", e);
            std::future::pending().await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        result = signal::ctrl_c() => result.map(|()| "Ctrl+C"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(windows)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    let mut close = signal::windows::ctrl_close()?;
    tokio::select! {
        result = signal::ctrl_c() => result.map(|()| "Ctrl+C"),
        _ = close.recv() => Ok("console close"),
    }
}

#[cfg(not(any(unix, windows)))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    signal::ctrl_c().await.map(|()| "Ctrl+C")
}
