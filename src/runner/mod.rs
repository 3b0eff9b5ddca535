//! Run orchestration
//!
//! The deadline-bounded execution loop, output capture/flush policy, the
//! comparison boundary, and the ordered test-event reporting protocol.

pub mod compare;
pub mod orchestrator;
pub mod report;
pub mod sink;

pub use compare::{ComparisonInvoker, ComparisonResult, ExpectedFileComparer, OutputComparer, Verdict};
pub use orchestrator::{RunOrchestrator, RunState, RunSummary};
pub use report::TestEventReporter;
pub use sink::OutputSink;
