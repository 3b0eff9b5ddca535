//! Test lifecycle reporting
//!
//! Emits the four lifecycle event kinds as TeamCity service messages, in
//! strict order, for an automated build-log reader. When reporting is
//! disabled every emission is a no-op.

use std::io::Write;

/// Message attached to the Failed event on deadline expiry
pub const TIMEOUT_MESSAGE: &str = "Test timeout";

/// Lifecycle events for one test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestEvent {
    Started,
    Ignored { message: String },
    Failed { message: String },
    Finished,
}

/// Emits ordered lifecycle events for CI consumption
pub struct TestEventReporter {
    enabled: bool,
    name: String,
    writer: Box<dyn Write + Send>,
}

impl TestEventReporter {
    /// Reporter writing to stdout
    pub fn stdout(enabled: bool, name: &str) -> Self {
        Self::with_writer(enabled, name, Box::new(std::io::stdout()))
    }

    /// Reporter with an injected destination
    pub fn with_writer(enabled: bool, name: &str, writer: Box<dyn Write + Send>) -> Self {
        Self {
            enabled,
            name: name.to_string(),
            writer,
        }
    }

    /// The run started. Emitted only on boot success, never after Ignored.
    pub fn started(&mut self) {
        self.emit(&TestEvent::Started);
    }

    /// The run could not even start. Emitted only on boot failure.
    pub fn ignored(&mut self, message: &str) {
        self.emit(&TestEvent::Ignored {
            message: message.to_string(),
        });
    }

    /// The run started and failed (timeout or comparison verdict)
    pub fn failed(&mut self, message: &str) {
        self.emit(&TestEvent::Failed {
            message: message.to_string(),
        });
    }

    /// The run is over. Always emitted, always last.
    pub fn finished(&mut self) {
        self.emit(&TestEvent::Finished);
    }

    fn emit(&mut self, event: &TestEvent) {
        if !self.enabled {
            return;
        }
        let name = escape(&self.name);
        let line = match event {
            TestEvent::Started => {
                format!("##teamcity[testStarted name='{name}' captureStandardOutput='true']\n")
            }
            TestEvent::Ignored { message } => format!(
                "##teamcity[testIgnored name='{name}' message='{}']\n",
                escape(message)
            ),
            TestEvent::Failed { message } => format!(
                "##teamcity[testFailed name='{name}' message='{}']\n",
                escape(message)
            ),
            TestEvent::Finished => format!("##teamcity[testFinished name='{name}']\n"),
        };
        let _ = self.writer.write_all(line.as_bytes());
        let _ = self.writer.flush();
    }
}

/// Derive the test name from the boot target path.
///
/// Strips the longest matching known directory prefix and the known
/// file-extension suffix, case-sensitive; paths matching neither come
/// through unchanged. Idempotent.
pub fn derive_test_name(boot_target: &str) -> String {
    const PREFIXES: [&str; 2] = ["pspautotests/tests/", "tests/"];
    const SUFFIX: &str = ".prx";

    let mut name = boot_target;
    for prefix in PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest;
            break;
        }
    }
    name.strip_suffix(SUFFIX).unwrap_or(name).to_string()
}

/// Escape a value field per the TeamCity service-message rules
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '|' => out.push_str("||"),
            '\'' => out.push_str("|'"),
            '[' => out.push_str("|["),
            ']' => out.push_str("|]"),
            '\n' => out.push_str("|n"),
            '\r' => out.push_str("|r"),
            _ => out.push(c),
        }
    }
    out
}
