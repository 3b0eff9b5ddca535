//! Logging and tracing configuration
//!
//! By default only errors from this crate are shown, so the emulated
//! program's own output stays readable. `-l/--log` raises the filter to
//! debug, mirroring a full log listener.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the runner (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable; when it is
/// unset, `full_log` selects between debug and errors-only defaults.
pub fn init(full_log: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if full_log {
            EnvFilter::new("emutest=debug,warn")
        } else {
            EnvFilter::new("emutest=error")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
