use std::time::Duration;
use crate::core::report::TestReport;

/// Contract implemented by every peripheral tester.
///
/// Implementations probe one hardware subsystem through kernel-exposed file
/// interfaces. `short_test` and `monitor_test` must restore the peripheral to
/// its pre-test state on every exit path; `is_available` must be a read-only
/// existence check with no side effects on hardware state.
pub trait PeripheralTester {
    /// Constant identifier for the peripheral, e.g. "CPU" or "GPIO".
    fn peripheral_name(&self) -> &'static str;

    /// Cheap existence check. Must not export or configure any hardware.
    fn is_available(&self) -> bool;

    /// Runs all applicable sub-checks once and aggregates them to a single
    /// outcome. Returns within seconds.
    fn short_test(&self) -> TestReport;

    /// Blocks the caller for approximately `duration`, sampling peripheral
    /// state repeatedly, and returns an aggregate stability verdict.
    fn monitor_test(&self, duration: Duration) -> TestReport;
}
