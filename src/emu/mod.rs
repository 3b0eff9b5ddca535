//! Emulation-core boundary
//!
//! The runner drives the core through a synchronous "advance by N units"
//! primitive; instruction execution itself lives behind this trait.

pub mod stub;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::config::RunConfig;
use crate::common::Result;
use crate::runner::sink::OutputSink;

/// Emulated time advanced per loop iteration, in microseconds.
///
/// Small enough that timeout detection latency is bounded by roughly one
/// quantum's wall-clock duration.
pub const QUANTUM_USEC: u64 = 1_000_000 / 10;

/// Shared run state observed after each quantum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreStatus {
    /// The emulated program is still executing
    Running,
    /// The emulated program finished a display frame and wants it swapped
    FrameReady,
    /// The emulated program terminated naturally
    Finished,
}

/// Cooperative cancellation signal threaded into `advance`
///
/// The core is expected to honor a stop request at its next internal
/// checkpoint; there is no mechanism to interrupt a call that never checks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a cooperative stop
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether a stop has been requested
    pub fn stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The external emulation core driven by the run orchestrator
pub trait EmuCore {
    /// Load and boot the configured target. An error here is terminal;
    /// the run loop is never entered.
    fn boot(&mut self, config: &RunConfig) -> Result<()>;

    /// Advance emulated time by `quantum_usec` microseconds.
    ///
    /// Blocks for a wall-clock duration proportional to the quantum.
    /// Program output produced during the slice goes through `output`;
    /// `cancel` is checked at the core's internal checkpoints.
    fn advance(
        &mut self,
        quantum_usec: u64,
        cancel: &CancelToken,
        output: &mut OutputSink,
    ) -> CoreStatus;

    /// Tear the core down. Called exactly once, after the run loop exits.
    fn shutdown(&mut self);
}
