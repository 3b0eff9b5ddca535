//! Null graphics host: no rendering at all

use std::path::Path;

use crate::common::Result;

use super::GraphicsHost;

/// Host used when graphics are disabled; every operation is a no-op.
#[derive(Debug, Default)]
pub struct NullHost;

impl NullHost {
    pub fn new() -> Self {
        Self
    }
}

impl GraphicsHost for NullHost {
    fn acquire(&mut self) -> Result<()> {
        Ok(())
    }

    fn swap_frame(&mut self) {}

    fn register_expected_screenshot(&mut self, path: &Path) {
        tracing::warn!(
            fixture = %path.display(),
            "screenshot comparison requested without a rendering backend"
        );
    }

    fn release(&mut self) {}

    fn flush_diagnostics(&mut self) {}
}
