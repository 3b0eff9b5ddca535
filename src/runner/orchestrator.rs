//! Run orchestration state machine
//!
//! Drives the emulation core through bounded time slices, detects timeout,
//! handles frame-swap requests, and guarantees resource cleanup on every
//! exit path.

use std::time::{Duration, Instant};

use crate::common::config::RunConfig;
use crate::common::Result;
use crate::emu::{CancelToken, CoreStatus, EmuCore, QUANTUM_USEC};
use crate::host::GraphicsHost;

use super::compare::{ComparisonInvoker, ComparisonResult, OutputComparer};
use super::report::{TestEventReporter, TIMEOUT_MESSAGE};
use super::sink::OutputSink;

/// Run lifecycle state. BootFailed, TimedOut and Completed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Acquiring resources and loading the boot target
    Booting,
    /// The emulated program is executing
    Running,
    /// A finished frame is waiting to be swapped
    AwaitingFrameSwap,
    /// Wall-clock time exceeded the deadline
    TimedOut,
    /// The emulated program terminated naturally
    Completed,
    /// The target could not even start
    BootFailed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Booting => write!(f, "booting"),
            Self::Running => write!(f, "running"),
            Self::AwaitingFrameSwap => write!(f, "awaiting frame swap"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Completed => write!(f, "completed"),
            Self::BootFailed => write!(f, "boot failed"),
        }
    }
}

/// Absolute wall-clock deadline, computed once at run start
#[derive(Debug, Clone, Copy)]
struct Deadline(Option<Instant>);

impl Deadline {
    fn start(timeout_secs: Option<f64>) -> Self {
        match timeout_secs {
            Some(secs) if secs >= 0.0 => Self(Some(Instant::now() + Duration::from_secs_f64(secs))),
            _ => Self(None),
        }
    }

    fn exceeded(&self) -> bool {
        matches!(self.0, Some(deadline) if Instant::now() > deadline)
    }
}

/// How the run ended, for the process exit path
#[derive(Debug)]
pub struct RunSummary {
    pub state: RunState,
    pub comparison: Option<ComparisonResult>,
}

impl RunSummary {
    /// Only a boot failure is visible through the exit status; test
    /// pass/fail is communicated through the reporting protocol.
    pub fn exit_code(&self) -> i32 {
        if self.state == RunState::BootFailed {
            1
        } else {
            0
        }
    }
}

/// Central state machine for one test run. One instance per process.
pub struct RunOrchestrator<'a> {
    config: &'a RunConfig,
    core: &'a mut dyn EmuCore,
    host: &'a mut dyn GraphicsHost,
    invoker: ComparisonInvoker<'a>,
    reporter: TestEventReporter,
    sink: OutputSink,
    state: RunState,
    cancel: CancelToken,
}

impl<'a> RunOrchestrator<'a> {
    /// Orchestrator wired to stdout for both program output and reporting
    pub fn new(
        config: &'a RunConfig,
        core: &'a mut dyn EmuCore,
        host: &'a mut dyn GraphicsHost,
        comparer: &'a dyn OutputComparer,
    ) -> Self {
        let reporter = TestEventReporter::stdout(config.reporting, &config.test_name);
        let sink = OutputSink::stdout(config.compare_output);
        Self::with_streams(config, core, host, comparer, reporter, sink)
    }

    /// Orchestrator with injected reporter and sink destinations
    pub fn with_streams(
        config: &'a RunConfig,
        core: &'a mut dyn EmuCore,
        host: &'a mut dyn GraphicsHost,
        comparer: &'a dyn OutputComparer,
        reporter: TestEventReporter,
        sink: OutputSink,
    ) -> Self {
        Self {
            config,
            core,
            host,
            invoker: ComparisonInvoker::new(comparer),
            reporter,
            sink,
            state: RunState::Booting,
            cancel: CancelToken::new(),
        }
    }

    /// Run the test to a terminal state and report the outcome.
    ///
    /// Every path through here releases the graphics resource and shuts
    /// the core down exactly once, in that order, and ends with exactly
    /// one Finished event.
    #[tracing::instrument(skip_all, fields(test = %self.config.test_name))]
    pub fn execute(mut self) -> RunSummary {
        if let Err(e) = self.initialize() {
            eprintln!("{e}");
            self.state = RunState::BootFailed;
            self.cleanup();
            self.reporter.ignored(&e.to_string());
            self.reporter.finished();
            return RunSummary {
                state: self.state,
                comparison: None,
            };
        }

        self.reporter.started();
        self.run_loop();
        self.cleanup();

        let comparison = if self.state == RunState::Completed && self.config.compare_output {
            Some(
                self.invoker
                    .invoke(&self.config.boot_target, self.sink.captured()),
            )
        } else {
            None
        };

        match self.state {
            RunState::TimedOut => self.reporter.failed(TIMEOUT_MESSAGE),
            RunState::Completed => {
                if let Some(result) = &comparison {
                    if !result.passed() {
                        self.reporter.failed(&result.diagnostic);
                    }
                }
            }
            state => debug_assert!(false, "non-terminal state after run loop: {state}"),
        }
        self.reporter.finished();

        RunSummary {
            state: self.state,
            comparison,
        }
    }

    /// Acquire the graphics resource and boot the target. Any failure is
    /// terminal; no loop iterations occur afterwards.
    fn initialize(&mut self) -> Result<()> {
        self.state = RunState::Booting;
        self.host.acquire()?;
        self.core.boot(self.config)?;
        if let Some(fixture) = &self.config.expected_screenshot {
            self.host.register_expected_screenshot(fixture);
        }
        tracing::debug!(image = %self.config.boot_target.display(), "boot complete");
        Ok(())
    }

    fn run_loop(&mut self) {
        let deadline = Deadline::start(self.config.timeout);
        self.state = RunState::Running;

        while self.state == RunState::Running {
            let status = self.core.advance(QUANTUM_USEC, &self.cancel, &mut self.sink);

            if status == CoreStatus::FrameReady {
                self.state = RunState::AwaitingFrameSwap;
                self.host.swap_frame();
                self.state = RunState::Running;
            }

            // The deadline wins over completion within the same quantum.
            if deadline.exceeded() {
                self.sink.flush();
                self.sink.write_through("TIMEOUT\n");
                self.state = RunState::TimedOut;
                self.cancel.request_stop();
                break;
            }

            if status == CoreStatus::Finished {
                self.state = RunState::Completed;
            }
        }
        tracing::debug!(state = %self.state, "run loop exited");
    }

    /// Shared shutdown phase: graphics release, then core shutdown, then
    /// diagnostic flush. Reached exactly once from every terminal state.
    fn cleanup(&mut self) {
        self.host.release();
        self.core.shutdown();
        self.host.flush_diagnostics();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::common::config::{CpuMode, GraphicsMode};
    use crate::common::Error;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Core that replays a fixed status script
    struct ScriptedCore {
        script: Vec<CoreStatus>,
        output_per_quantum: Option<String>,
        boot_error: Option<String>,
        advances: usize,
        shutdowns: usize,
    }

    impl ScriptedCore {
        fn completing(script: &[CoreStatus]) -> Self {
            Self {
                script: script.to_vec(),
                output_per_quantum: None,
                boot_error: None,
                advances: 0,
                shutdowns: 0,
            }
        }

        fn failing_boot(reason: &str) -> Self {
            let mut core = Self::completing(&[]);
            core.boot_error = Some(reason.to_string());
            core
        }
    }

    impl EmuCore for ScriptedCore {
        fn boot(&mut self, config: &RunConfig) -> Result<()> {
            match &self.boot_error {
                Some(reason) => Err(Error::boot(&config.boot_target, reason.clone())),
                None => Ok(()),
            }
        }

        fn advance(
            &mut self,
            _quantum_usec: u64,
            _cancel: &CancelToken,
            output: &mut OutputSink,
        ) -> CoreStatus {
            // Make each quantum take measurable wall time so a zero
            // timeout reliably expires inside the first iteration.
            thread::sleep(Duration::from_millis(2));
            if let Some(text) = &self.output_per_quantum {
                output.append(text);
            }
            let status = self
                .script
                .get(self.advances)
                .copied()
                .unwrap_or(CoreStatus::Running);
            self.advances += 1;
            status
        }

        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }
    }

    #[derive(Default)]
    struct CountingHost {
        acquires: usize,
        releases: usize,
        swaps: usize,
        diag_flushes: usize,
        fail_acquire: bool,
        screenshot: Option<PathBuf>,
    }

    impl GraphicsHost for CountingHost {
        fn acquire(&mut self) -> Result<()> {
            self.acquires += 1;
            if self.fail_acquire {
                return Err(Error::GraphicsInit("no display".to_string()));
            }
            Ok(())
        }

        fn swap_frame(&mut self) {
            self.swaps += 1;
        }

        fn register_expected_screenshot(&mut self, path: &Path) {
            self.screenshot = Some(path.to_path_buf());
        }

        fn release(&mut self) {
            self.releases += 1;
        }

        fn flush_diagnostics(&mut self) {
            self.diag_flushes += 1;
        }
    }

    /// Comparer returning a canned verdict and recording its input
    struct StaticComparer {
        result: ComparisonResult,
        seen: RefCell<Option<(PathBuf, String)>>,
    }

    impl StaticComparer {
        fn returning(result: ComparisonResult) -> Self {
            Self {
                result,
                seen: RefCell::new(None),
            }
        }
    }

    impl OutputComparer for StaticComparer {
        fn compare(&self, boot_target: &Path, captured: &str) -> ComparisonResult {
            *self.seen.borrow_mut() = Some((boot_target.to_path_buf(), captured.to_string()));
            self.result.clone()
        }
    }

    fn config(timeout: Option<f64>, compare_output: bool) -> RunConfig {
        RunConfig {
            cpu: CpuMode::Accelerated,
            graphics: GraphicsMode::Null,
            boot_target: PathBuf::from("tests/cpu/alu.prx"),
            mount_image: None,
            timeout,
            expected_screenshot: None,
            compare_output,
            verbose_log: false,
            reporting: true,
            test_name: "cpu/alu".to_string(),
        }
    }

    fn run(
        config: &RunConfig,
        core: &mut ScriptedCore,
        host: &mut CountingHost,
        comparer: &StaticComparer,
    ) -> (RunSummary, String) {
        // One stream for both program output and events, so relative
        // ordering is observable.
        let stream = SharedBuf::default();
        let reporter = TestEventReporter::with_writer(
            config.reporting,
            &config.test_name,
            Box::new(stream.clone()),
        );
        let sink = OutputSink::with_writer(config.compare_output, Box::new(stream.clone()));
        let summary =
            RunOrchestrator::with_streams(config, core, host, comparer, reporter, sink).execute();
        (summary, stream.contents())
    }

    #[test]
    fn test_clean_completion_reports_started_and_finished_only() {
        let config = config(None, false);
        let mut core = ScriptedCore::completing(&[
            CoreStatus::Running,
            CoreStatus::FrameReady,
            CoreStatus::Finished,
        ]);
        let mut host = CountingHost::default();
        let comparer = StaticComparer::returning(ComparisonResult::pass());

        let (summary, out) = run(&config, &mut core, &mut host, &comparer);

        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.exit_code(), 0);
        assert!(out.contains("testStarted"));
        assert!(out.contains("testFinished"));
        assert!(!out.contains("testFailed"));
        assert!(!out.contains("testIgnored"));
        assert!(out.find("testStarted").unwrap() < out.find("testFinished").unwrap());
        assert_eq!(host.swaps, 1);
        assert_eq!(core.advances, 3);
        // Comparison was not requested
        assert!(comparer.seen.borrow().is_none());
    }

    #[test]
    fn test_timeout_flushes_before_failing() {
        let config = config(Some(0.0), true);
        let mut core = ScriptedCore::completing(&[CoreStatus::Running; 8]);
        core.output_per_quantum = Some("partial result\n".to_string());
        let mut host = CountingHost::default();
        let comparer = StaticComparer::returning(ComparisonResult::pass());

        let (summary, out) = run(&config, &mut core, &mut host, &comparer);

        assert_eq!(summary.state, RunState::TimedOut);
        assert_eq!(summary.exit_code(), 0);
        // Deadline detection latency is bounded by one quantum
        assert_eq!(core.advances, 1);
        // Buffered output is flushed, then TIMEOUT, then the failure event
        let flushed = out.find("partial result").unwrap();
        let timeout_line = out.find("TIMEOUT").unwrap();
        let failed = out.find("testFailed").unwrap();
        let finished = out.find("testFinished").unwrap();
        assert!(flushed < timeout_line && timeout_line < failed && failed < finished);
        assert!(out.contains("message='Test timeout'"));
        // No comparison after a timeout
        assert!(comparer.seen.borrow().is_none());
        assert!(summary.comparison.is_none());
    }

    #[test]
    fn test_boot_failure_reports_ignored_then_finished() {
        let config = config(None, false);
        let mut core = ScriptedCore::failing_boot("file not found");
        let mut host = CountingHost::default();
        let comparer = StaticComparer::returning(ComparisonResult::pass());

        let (summary, out) = run(&config, &mut core, &mut host, &comparer);

        assert_eq!(summary.state, RunState::BootFailed);
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(core.advances, 0);
        assert!(!out.contains("testStarted"));
        assert!(out.contains("testIgnored"));
        assert!(out.find("testIgnored").unwrap() < out.find("testFinished").unwrap());
    }

    #[test]
    fn test_graphics_acquire_failure_is_a_boot_failure() {
        let config = config(None, false);
        let mut core = ScriptedCore::completing(&[CoreStatus::Finished]);
        let mut host = CountingHost {
            fail_acquire: true,
            ..CountingHost::default()
        };
        let comparer = StaticComparer::returning(ComparisonResult::pass());

        let (summary, out) = run(&config, &mut core, &mut host, &comparer);

        assert_eq!(summary.state, RunState::BootFailed);
        assert_eq!(core.advances, 0);
        assert!(out.contains("testIgnored"));
        // Cleanup still runs exactly once
        assert_eq!(host.releases, 1);
        assert_eq!(core.shutdowns, 1);
    }

    #[test]
    fn test_cleanup_runs_exactly_once_on_every_path() {
        for (mut core, timeout) in [
            (ScriptedCore::completing(&[CoreStatus::Finished]), None),
            (ScriptedCore::completing(&[CoreStatus::Running; 8]), Some(0.0)),
            (ScriptedCore::failing_boot("file not found"), None),
        ] {
            let config = config(timeout, false);
            let mut host = CountingHost::default();
            let comparer = StaticComparer::returning(ComparisonResult::pass());
            run(&config, &mut core, &mut host, &comparer);
            assert_eq!(host.acquires, 1);
            assert_eq!(host.releases, 1);
            assert_eq!(core.shutdowns, 1);
            assert_eq!(host.diag_flushes, 1);
        }
    }

    #[test]
    fn test_failing_comparison_fails_the_test() {
        let config = config(None, true);
        let mut core = ScriptedCore::completing(&[CoreStatus::Running, CoreStatus::Finished]);
        core.output_per_quantum = Some("wrong\n".to_string());
        let mut host = CountingHost::default();
        let comparer =
            StaticComparer::returning(ComparisonResult::fail("Line 1: expected 'ok', got 'wrong'"));

        let (summary, out) = run(&config, &mut core, &mut host, &comparer);

        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.exit_code(), 0);
        assert!(out.contains("testFailed"));
        assert!(out.contains("expected |'ok|', got |'wrong|'"));
        assert!(out.find("testFailed").unwrap() < out.find("testFinished").unwrap());
        // The collaborator saw the captured text, which was never echoed
        let seen = comparer.seen.borrow();
        let (path, captured) = seen.as_ref().unwrap();
        assert_eq!(path, &config.boot_target);
        assert_eq!(captured, "wrong\nwrong\n");
        assert!(!out.contains("wrong\nwrong\n"));
    }

    #[test]
    fn test_passing_comparison_stays_quiet() {
        let config = config(None, true);
        let mut core = ScriptedCore::completing(&[CoreStatus::Finished]);
        let mut host = CountingHost::default();
        let comparer = StaticComparer::returning(ComparisonResult::pass());

        let (summary, out) = run(&config, &mut core, &mut host, &comparer);

        assert_eq!(summary.state, RunState::Completed);
        assert!(!out.contains("testFailed"));
        assert!(comparer.seen.borrow().is_some());
    }

    #[test]
    fn test_comparison_error_fails_the_test() {
        let config = config(None, true);
        let mut core = ScriptedCore::completing(&[CoreStatus::Finished]);
        let mut host = CountingHost::default();
        let comparer =
            StaticComparer::returning(ComparisonResult::error("Expected output file unreadable"));

        let (_, out) = run(&config, &mut core, &mut host, &comparer);
        assert!(out.contains("testFailed"));
        assert!(out.contains("unreadable"));
    }

    #[test]
    fn test_screenshot_registered_before_run() {
        let mut config = config(None, false);
        config.expected_screenshot = Some(PathBuf::from("tests/cpu/alu.bmp"));
        let mut core = ScriptedCore::completing(&[CoreStatus::Finished]);
        let mut host = CountingHost::default();
        let comparer = StaticComparer::returning(ComparisonResult::pass());

        run(&config, &mut core, &mut host, &comparer);
        assert_eq!(host.screenshot, Some(PathBuf::from("tests/cpu/alu.bmp")));
    }

    #[test]
    fn test_reporting_disabled_emits_nothing() {
        let mut config = config(None, false);
        config.reporting = false;
        let mut core = ScriptedCore::completing(&[CoreStatus::Finished]);
        let mut host = CountingHost::default();
        let comparer = StaticComparer::returning(ComparisonResult::pass());

        let (summary, out) = run(&config, &mut core, &mut host, &comparer);
        assert_eq!(summary.state, RunState::Completed);
        assert!(!out.contains("##teamcity"));
    }
}
