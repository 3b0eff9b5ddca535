//! emutest - headless single-test runner for emulator test images
//!
//! One process instance runs exactly one test case: boot, run to
//! completion or timeout, compare, report.

use clap::Parser;

use emutest::cli::Args;
use emutest::common::config::Defaults;
use emutest::common::logging;
use emutest::emu::stub::StubCore;
use emutest::host;
use emutest::runner::{ExpectedFileComparer, RunOrchestrator};

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version exit 0; malformed input prints usage to
            // the error stream and exits 1, before any orchestrator or
            // collaborator exists.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logging::init(args.log);

    let defaults = match Defaults::load() {
        Ok(defaults) => defaults,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let config = args.into_config(&defaults);
    tracing::debug!(?config, "starting run");

    let mut core = StubCore::new();
    let mut graphics = host::for_mode(config.graphics);
    let comparer = ExpectedFileComparer;

    let summary =
        RunOrchestrator::new(&config, &mut core, graphics.as_mut(), &comparer).execute();
    std::process::exit(summary.exit_code());
}
