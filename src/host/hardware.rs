//! GPU-backed graphics host

use std::path::{Path, PathBuf};

use crate::common::config::HardwareBackend;
use crate::common::{Error, Result};

use super::GraphicsHost;

/// Host driving a full GPU backend. Slower than the null host but required
/// for tests that exercise the rendering pipeline.
#[derive(Debug)]
pub struct HardwareHost {
    backend: HardwareBackend,
    acquired: bool,
    frames: u64,
    expected_screenshot: Option<PathBuf>,
}

impl HardwareHost {
    pub fn new(backend: HardwareBackend) -> Self {
        Self {
            backend,
            acquired: false,
            frames: 0,
            expected_screenshot: None,
        }
    }
}

impl GraphicsHost for HardwareHost {
    fn acquire(&mut self) -> Result<()> {
        if self.backend == HardwareBackend::DirectX9 && !cfg!(windows) {
            return Err(Error::GraphicsInit(
                "directx9 backend is only available on Windows".to_string(),
            ));
        }
        self.acquired = true;
        tracing::debug!(backend = ?self.backend, "gpu context acquired");
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
            tracing::debug!(backend = ?self.backend, frames = self.frames, "gpu context released");
        }
        self.acquired = false;
    }

    fn flush_diagnostics(&mut self) {
        tracing::debug!(backend = ?self.backend, frames = self.frames, "gpu backend finished");
    }
}
