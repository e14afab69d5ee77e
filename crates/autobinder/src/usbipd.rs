//! usbipd adapter
//!
//! Wraps the external `usbipd` tool behind [`SharingTool`], the seam the
//! reconciler and scheduler are written against. Attach and detach are
//! fire-and-forget: their output only reaches the debug log. Listing waits
//! for the process and returns whatever stdout it produced, even on a
//! non-zero exit.

use common::{ProcessRegistry, ToolOutput};
use protocol::{BusId, UsbipdCommand};
use std::future::Future;
use tracing::{debug, info};

/// Operations the binder needs from the device-sharing tool
pub trait SharingTool {
    /// Fetch the raw device listing
    ///
    /// Never fails; a tool that cannot be run yields an empty listing.
    fn list(&self) -> impl Future<Output = String> + Send;

    /// Bind a device to the guest without waiting for the result
    fn attach(&self, bus_id: &BusId, label: &str);

    /// Return every device to the host without waiting for the result
    fn detach_all(&self);
}

/// The real `usbipd` command-line tool
#[derive(Debug, Clone)]
pub struct Usbipd {
    program: String,
    distribution: Option<String>,
    registry: ProcessRegistry,
}

impl Usbipd {
    pub fn new(
        program: impl Into<String>,
        distribution: Option<String>,
        registry: ProcessRegistry,
    ) -> Self {
        Self {
            program: program.into(),
            distribution: distribution.filter(|name| !name.is_empty()),
            registry,
        }
    }

    /// Argument vector for a command, including the target distribution
    pub fn args(&self, command: &UsbipdCommand) -> Vec<String> {
        command.args(self.distribution.as_deref())
    }

    /// Run a command and wait for it to exit
    pub async fn run(&self, command: &UsbipdCommand) -> common::Result<ToolOutput> {
        self.registry
            .spawn(&self.program, &self.args(command))
            .wait()
            .await
    }

    /// Run a command in the background, logging its output at debug level
    fn spawn_logged(&self, command: &UsbipdCommand, label: Option<&str>) {
        let prefix = label.map(|l| format!("{}: ", l)).unwrap_or_default();
        let verb = command.verb();

        self.registry
            .spawn_detached(&self.program, &self.args(command), move |result| {
                match result {
                    Ok(output) => {
                        for line in output.stdout_lines() {
                            debug!("{}{}", prefix, line);
                        }
                        for line in output.stderr_lines() {
                            debug!("{}ERROR: {}", prefix, line);
                        }
                        debug!("{}{} exited with code {:?}", prefix, verb, output.status);
                    }
                    Err(e) => debug!("{}ERROR: {} failed: {}", prefix, verb, e),
                }
            });
    }
}

impl SharingTool for Usbipd {
    async fn list(&self) -> String {
        match self.run(&UsbipdCommand::List).await {
            Ok(output) => {
                for line in output.stderr_lines() {
                    debug!("{}", line);
                }
                if !output.success() {
                    debug!("usbipd list exited with code {:?}", output.status);
                }
                output.stdout
            }
            Err(e) => {
                debug!("usbipd list failed: {}", e);
                String::new()
            }
        }
    }

    fn attach(&self, bus_id: &BusId, label: &str) {
        info!("{}: Binding device {}", label, bus_id);
        self.spawn_logged(
            &UsbipdCommand::Attach {
                bus_id: bus_id.clone(),
            },
            Some(label),
        );
    }

    fn detach_all(&self) {
        info!("Unbinding all devices");
        self.spawn_logged(&UsbipdCommand::DetachAll, None);
    }
}
