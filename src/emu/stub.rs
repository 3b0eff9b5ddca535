//! Stand-in emulation core
//!
//! Used by the `emutest` binary when no real emulator backend is linked in,
//! and by the end-to-end tests. Validates the boot target and mount image,
//! then runs a short scripted program: one plain quantum, one rendered
//! frame, then natural termination.

use std::thread;
use std::time::Duration;

use crate::common::config::RunConfig;
use crate::common::{Error, Result};
use crate::runner::sink::OutputSink;

use super::{CancelToken, CoreStatus, EmuCore};

/// Wall-clock slowdown relative to emulated time. A 100ms quantum blocks
/// for 5ms, keeping advance proportional to the quantum without making
/// test runs crawl.
const WALL_CLOCK_DIVISOR: u64 = 20;

/// Minimal core that boots any readable file and runs an empty program
#[derive(Debug, Default)]
pub struct StubCore {
    booted: bool,
    quanta: u32,
    banner: Option<String>,
}

impl StubCore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EmuCore for StubCore {
    fn boot(&mut self, config: &RunConfig) -> Result<()> {
        if !config.boot_target.is_file() {
            return Err(Error::boot(&config.boot_target, "file not found"));
        }
        if let Some(mount) = &config.mount_image {
            if !mount.is_file() {
                return Err(Error::boot(
                    &config.boot_target,
                    format!("mount image '{}' not found", mount.display()),
                ));
            }
        }

        let file_name = config
            .boot_target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.banner = Some(format!("stub core executed {file_name}\n"));
        self.booted = true;
        tracing::debug!(image = %config.boot_target.display(), cpu = ?config.cpu, "stub core booted");
        Ok(())
    }

    fn advance(
        &mut self,
        quantum_usec: u64,
        cancel: &CancelToken,
        output: &mut OutputSink,
    ) -> CoreStatus {
        debug_assert!(self.booted, "advance before boot");

        // Checkpoint: honor a pending stop request before doing any work.
        if cancel.stop_requested() {
            tracing::debug!("stub core honoring stop request");
            return CoreStatus::Finished;
        }

        thread::sleep(Duration::from_micros(quantum_usec / WALL_CLOCK_DIVISOR));

        if let Some(banner) = self.banner.take() {
            output.append(&banner);
        }

        self.quanta += 1;
        match self.quanta {
            1 => CoreStatus::Running,
            2 => CoreStatus::FrameReady,
            _ => CoreStatus::Finished,
        }
    }

    fn shutdown(&mut self) {
        self.booted = false;
        tracing::debug!("stub core shut down");
    }
}
