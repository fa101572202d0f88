use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// The outcome of a peripheral test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestResult {
    Success,
    Failure,
    /// The peripheral or interface is absent on this hardware. Distinct from
    /// `Failure`, which means the interface is present but misbehaved.
    NotSupported,
    Timeout,
    Skipped,
}

impl TestResult {
    /// Returns `true` if the outcome counts as a hard failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TestResult::Failure | TestResult::Timeout)
    }

    /// Short uppercase label for reporters.
    pub fn label(&self) -> &'static str {
        match self {
            TestResult::Success => "PASS",
            TestResult::Failure => "FAIL",
            TestResult::NotSupported => "NOT SUPPORTED",
            TestResult::Timeout => "TIMEOUT",
            TestResult::Skipped => "SKIPPED",
        }
    }
}

/// An immutable snapshot of one `short_test` or `monitor_test` invocation.
///
/// Created exactly once per invocation and never mutated afterwards.
/// `duration` is the wall-clock time of the whole call regardless of outcome;
/// `timestamp` is the capture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub result: TestResult,
    pub peripheral_name: String,
    pub duration: Duration,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl TestReport {
    pub fn new(
        result: TestResult,
        peripheral_name: impl Into<String>,
        details: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            result,
            peripheral_name: peripheral_name.into(),
            duration,
            details: details.into(),
            timestamp: Utc::now(),
        }
    }
}
