//! Run configuration
//!
//! A `RunConfig` is built once, before the orchestrator exists, and passed
//! by reference into every component. Nothing mutates it afterwards.

use serde::Deserialize;
use std::path::PathBuf;

use super::paths::defaults_path;
use super::Result;

/// CPU execution strategy for the emulation core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuMode {
    /// Interpreted execution
    Interpreter,
    /// Accelerated (recompiling) execution, the default
    #[default]
    Accelerated,
}

/// Hardware-accelerated graphics backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareBackend {
    Gles,
    DirectX9,
}

/// Graphics mode, chosen once at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphicsMode {
    /// No rendering at all
    #[default]
    Null,
    /// Software rasterizer
    Software,
    /// Full GPU backend
    Hardware(HardwareBackend),
}

impl GraphicsMode {
    /// Parse a backend name as accepted by `--graphics=BACKEND`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gles" => Some(Self::Hardware(HardwareBackend::Gles)),
            "directx9" => Some(Self::Hardware(HardwareBackend::DirectX9)),
            "software" => Some(Self::Software),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

impl std::fmt::Display for GraphicsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Software => write!(f, "software"),
            Self::Hardware(HardwareBackend::Gles) => write!(f, "gles"),
            Self::Hardware(HardwareBackend::DirectX9) => write!(f, "directx9"),
        }
    }
}

/// Immutable configuration for a single test run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// CPU execution mode
    pub cpu: CpuMode,
    /// Graphics mode
    pub graphics: GraphicsMode,
    /// The executable test image to boot
    pub boot_target: PathBuf,
    /// Optional disk image mounted as removable storage
    pub mount_image: Option<PathBuf>,
    /// Timeout in seconds; None means unbounded
    pub timeout: Option<f64>,
    /// Screenshot fixture registered with the graphics host before the run
    pub expected_screenshot: Option<PathBuf>,
    /// Capture program output and compare against the stored fixture
    pub compare_output: bool,
    /// Full log output, not just the emulated program's printfs
    pub verbose_log: bool,
    /// Emit lifecycle events for a CI log consumer
    pub reporting: bool,
    /// Test name derived from the boot target path
    pub test_name: String,
}

/// Optional defaults loaded from `emutest.toml`
///
/// CLI flags always win; the file only fills in what the command line
/// leaves unspecified.
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Defaults {
    /// Timeout applied when `--timeout` is absent
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    /// Backend used for a bare `--graphics` flag
    #[serde(default)]
    pub graphics_backend: Option<String>,
}

impl Defaults {
    /// Load defaults from the platform config directory
    ///
    /// Returns built-in defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        match defaults_path() {
            Some(path) if path.exists() => {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    })?;
                Self::parse(&content)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Parse defaults from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
