//! Reconciliation loop
//!
//! Owns the configuration, the tool and the reconciler for the lifetime of
//! the process. Startup optionally detaches everything and waits for usbipd
//! to settle, then ticks immediately and every poll interval after that.
//!
//! Ticks are serialized: each tick is awaited before the next one starts, and
//! ticks missed while a slow listing was running are skipped rather than run
//! back to back. Attach processes are not awaited and may outlive their tick.

use crate::config::BinderConfig;
use crate::reconciler::{Reconciler, TickReport};
use crate::usbipd::SharingTool;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

pub struct Scheduler<T> {
    tool: T,
    config: BinderConfig,
    reconciler: Reconciler,
}

impl<T: SharingTool> Scheduler<T> {
    pub fn new(tool: T, config: BinderConfig) -> Self {
        Self {
            tool,
            config,
            reconciler: Reconciler::new(),
        }
    }

    /// Run the loop forever
    pub async fn run(&mut self) {
        self.startup().await;

        let mut ticker = time::interval(self.config.timing.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One-time work before the first tick
    async fn startup(&self) {
        if self.config.unbind_all_at_startup {
            self.tool.detach_all();
            let grace = self.config.timing.startup_grace();
            info!("Waiting {:?} for devices to detach", grace);
            time::sleep(grace).await;
        }

        let listing = self.tool.list().await;
        info!("Current devices:\n{}", listing.trim_end());
    }

    /// Run one tick, logging a failure instead of returning it
    async fn tick(&mut self) -> Option<TickReport> {
        match self.reconciler.tick(&self.tool, &self.config).await {
            Ok(report) => {
                if report.captured_snapshot {
                    info!("Watching from a baseline of {} device(s)", report.devices);
                }
                debug!(
                    "Tick complete: {} device(s), {} attach(es), {} in baseline",
                    report.devices,
                    report.actions.len(),
                    self.reconciler.snapshot().map_or(0, |s| s.len())
                );
                Some(report)
            }
            Err(e) => {
                error!("Reconciliation tick failed: {:#}", e);
                None
            }
        }
    }
}
