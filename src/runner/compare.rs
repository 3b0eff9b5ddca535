//! Output comparison boundary
//!
//! The invoker forwards captured output to the comparison collaborator and
//! relays its verdict; it implements no diff logic itself.

use std::path::Path;

/// Tri-state verdict from the comparison collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Error,
}

/// Verdict plus a diagnostic suitable for a Failed event message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResult {
    pub verdict: Verdict,
    pub diagnostic: String,
}

impl ComparisonResult {
    pub fn pass() -> Self {
        Self {
            verdict: Verdict::Pass,
            diagnostic: String::new(),
        }
    }

    pub fn fail(diagnostic: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Fail,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn error(diagnostic: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Error,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// External comparison collaborator
pub trait OutputComparer {
    /// Diff the captured output against the fixture for this boot target
    fn compare(&self, boot_target: &Path, captured: &str) -> ComparisonResult;
}

/// Thin boundary between the orchestrator and the comparison collaborator
pub struct ComparisonInvoker<'a> {
    comparer: &'a dyn OutputComparer,
}

impl<'a> ComparisonInvoker<'a> {
    pub fn new(comparer: &'a dyn OutputComparer) -> Self {
        Self { comparer }
    }

    pub fn invoke(&self, boot_target: &Path, captured: &str) -> ComparisonResult {
        tracing::debug!(image = %boot_target.display(), bytes = captured.len(), "invoking comparison");
        self.comparer.compare(boot_target, captured)
    }
}

/// Comparer that locates the fixture by swapping the boot target's
/// extension for `.expected`.
#[derive(Debug, Default)]
pub struct ExpectedFileComparer;

impl OutputComparer for ExpectedFileComparer {
    fn compare(&self, boot_target: &Path, captured: &str) -> ComparisonResult {
        let fixture = boot_target.with_extension("expected");
        let expected = match std::fs::read_to_string(&fixture) {
            Ok(text) => text,
            Err(e) => {
                return ComparisonResult::error(format!(
                    "Expected output file '{}' unreadable: {e}",
                    fixture.display()
                ))
            }
        };

        let expected = normalize(&expected);
        let captured = normalize(captured);
        if expected == captured {
            return ComparisonResult::pass();
        }

        ComparisonResult::fail(first_difference(&expected, &captured))
    }
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Describe the first line where expected and actual output diverge
fn first_difference(expected: &str, actual: &str) -> String {
    let mut expected_lines = expected.lines();
    let mut actual_lines = actual.lines();
    let mut line_no = 1usize;
    loop {
        match (expected_lines.next(), actual_lines.next()) {
            (Some(e), Some(a)) if e == a => line_no += 1,
            (Some(e), Some(a)) => {
                return format!("Line {line_no}: expected '{e}', got '{a}'");
            }
            (Some(e), None) => {
                return format!("Line {line_no}: expected '{e}', got end of output");
            }
            (None, Some(a)) => {
                return format!("Line {line_no}: unexpected extra output '{a}'");
            }
            (None, None) => {
                // Same lines but different trailing whitespace
                return "Output differs only in trailing whitespace".to_string();
            }
        }
    }
}
