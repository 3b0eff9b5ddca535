//! CLI argument surface
//!
//! Pure translation from flags to a `RunConfig`; validation only, no run
//! control flow lives here.

use clap::Parser;
use std::path::PathBuf;

use crate::common::config::{CpuMode, Defaults, GraphicsMode, HardwareBackend, RunConfig};
use crate::runner::report::derive_test_name;

#[derive(Parser, Debug)]
#[command(name = "emutest", version, about = "Headless emulator test runner")]
#[command(
    long_about = "Headless emulator test runner.\n\n\
        This is primarily meant as a non-interactive test tool: it boots one \
        executable test image, runs it to completion or timeout, and reports \
        the outcome for a CI consumer."
)]
pub struct Args {
    /// Executable test image to boot
    #[arg(value_name = "FILE")]
    pub boot_target: PathBuf,

    /// Mount a disk image as removable storage
    #[arg(short = 'm', long = "mount", value_name = "IMAGE")]
    pub mount: Option<PathBuf>,

    /// Full log output, not just emulated printfs
    #[arg(short = 'l', long = "log")]
    pub log: bool,

    /// Use the interpreter
    #[arg(short = 'i', overrides_with = "jit")]
    pub interpreter: bool,

    /// Use accelerated execution (default)
    #[arg(short = 'j', overrides_with = "interpreter")]
    pub jit: bool,

    /// Compare output with FILE.expected
    #[arg(short = 'c', long = "compare")]
    pub compare: bool,

    /// Use a full gpu backend (slower): gles, software, directx9, null
    #[arg(
        long = "graphics",
        value_name = "BACKEND",
        num_args = 0..=1,
        require_equals = true,
        value_parser = parse_backend
    )]
    pub graphics: Option<Option<GraphicsMode>>,

    /// Compare rendered frames against a screenshot fixture
    #[arg(long = "screenshot", value_name = "FILE", require_equals = true)]
    pub screenshot: Option<PathBuf>,

    /// Abort the test if it takes longer than SECONDS (fractions allowed,
    /// negative means unbounded)
    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        require_equals = true,
        allow_hyphen_values = true,
        value_parser = parse_timeout
    )]
    pub timeout: Option<f64>,

    /// Emit TeamCity service messages for a CI build-log reader
    #[arg(long = "teamcity")]
    pub teamcity: bool,
}

impl Args {
    /// Build the immutable run configuration, filling gaps from the
    /// defaults file. CLI flags always win.
    pub fn into_config(self, defaults: &Defaults) -> RunConfig {
        let cpu = if self.interpreter {
            CpuMode::Interpreter
        } else {
            CpuMode::Accelerated
        };

        let graphics = match self.graphics {
            None => GraphicsMode::Null,
            Some(Some(mode)) => mode,
            // Bare --graphics: the defaults file may name a backend,
            // otherwise the GPU-accelerated default applies.
            Some(None) => defaults
                .graphics_backend
                .as_deref()
                .and_then(GraphicsMode::from_name)
                .unwrap_or(GraphicsMode::Hardware(HardwareBackend::Gles)),
        };

        let timeout = self
            .timeout
            .or(defaults.timeout_secs)
            .filter(|secs| *secs >= 0.0);

        let test_name = derive_test_name(&self.boot_target.to_string_lossy());

        RunConfig {
            cpu,
            graphics,
            boot_target: self.boot_target,
            mount_image: self.mount,
            timeout,
            expected_screenshot: self.screenshot,
            compare_output: self.compare,
            verbose_log: self.log,
            reporting: self.teamcity,
            test_name,
        }
    }
}

fn parse_backend(s: &str) -> Result<GraphicsMode, String> {
    GraphicsMode::from_name(s).ok_or_else(|| {
        format!("unknown gpu backend '{s}' (expected gles, software, directx9 or null)")
    })
}

/// Permissive float parse matching `strtod`: the longest leading prefix
/// that parses wins, and garbage collapses to 0.0 (an immediate deadline)
/// rather than an argument error.
fn parse_timeout(s: &str) -> Result<f64, std::convert::Infallible> {
    Ok(leading_f64(s))
}

fn leading_f64(s: &str) -> f64 {
    let s = s.trim_start();
    let mut value = 0.0;
    let ends = s.char_indices().map(|(i, _)| i).skip(1).chain([s.len()]);
    for end in ends {
        if let Ok(parsed) = s[..end].parse::<f64>() {
            value = parsed;
        }
    }
    value
}
