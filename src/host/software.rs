//! Software rasterizer host

use std::path::{Path, PathBuf};

use crate::common::Result;

use super::GraphicsHost;

/// Host backed by the software rasterizer. Rendering internals stay in the
/// rasterizer; this type tracks the run-scoped resource and per-frame
/// screenshot comparison registration.
#[derive(Debug, Default)]
pub struct SoftwareHost {
    acquired: bool,
    frames: u64,
    expected_screenshot: Option<PathBuf>,
}

impl SoftwareHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphicsHost for SoftwareHost {
    fn acquire(&mut self) -> Result<()> {
        self.acquired = true;
        tracing::debug!("software rasterizer ready");
        Ok(())
    }

    fn swap_frame(&mut self) {
        self.frames += 1;
        if let Some(fixture) = &self.expected_screenshot {
            tracing::trace!(frame = self.frames, fixture = %fixture.display(), "comparing frame");
        }
    }

    fn register_expected_screenshot(&mut self, path: &Path) {
        self.expected_screenshot = Some(path.to_path_buf());
    }

    fn release(&mut self) {
        if self.acquired {
            tracing::debug!(frames = self.frames, "software rasterizer released");
        }
        self.acquired = false;
    }

    fn flush_diagnostics(&mut self) {
        tracing::debug!(frames = self.frames, "software rasterizer finished");
    }
}
