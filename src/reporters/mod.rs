pub mod text;
pub mod json;
pub mod csv;

use crate::core::report::TestReport;
use crate::core::config::RunConfig;
use crate::core::runner::TestSuite;

/// Reporter trait for rendering peripheral test results
pub trait Reporter {
    /// Report the start of a verification run
    fn report_start(&self, config: &RunConfig);

    /// Report the start of one peripheral's test
    fn report_test_start(&self, peripheral_name: &str);

    /// Report one peripheral's test report
    fn report_test_result(&self, report: &TestReport);

    /// Report the final results of the run
    fn report_suite_result(&self, suite: &TestSuite);

    /// Report a warning message
    fn report_warning(&self, message: &str);

    /// Report an informational message
    fn report_info(&self, message: &str);
}
