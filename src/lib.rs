//! emutest - headless single-test runner for emulator test images
//!
//! Boots one executable test image inside an emulation core, runs it to
//! completion or timeout, optionally compares its output against a stored
//! fixture, and emits ordered lifecycle events for a CI log consumer.

pub mod cli;
pub mod common;
pub mod emu;
pub mod host;
pub mod runner;

// Re-export commonly used types for tests
pub use common::config::RunConfig;
pub use common::{Error, Result};
pub use runner::{RunState, RunSummary};
