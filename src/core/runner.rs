use std::sync::{Arc, Mutex};
use std::time::Instant;
use crate::core::error::{Result, BoardcheckError};
use crate::core::report::{TestReport, TestResult};
use crate::core::tester::PeripheralTester;
use crate::core::config::RunConfig;
use crate::reporters::Reporter;

/// The test mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    Short,
    Monitor,
}

/// Collection of peripheral test reports from one run.
#[derive(Debug)]
pub struct TestSuite {
    pub reports: Vec<TestReport>,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub overall_result: TestResult,
    pub duration: std::time::Duration,
}

impl TestSuite {
    pub fn new() -> Self {
        Self {
            reports: Vec::new(),
            start_time: chrono::Utc::now(),
            end_time: None,
            overall_result: TestResult::Skipped,
            duration: std::time::Duration::from_secs(0),
        }
    }

    /// Calculate the overall result. `NotSupported` and `Skipped` reports
    /// describe absent hardware and do not fail the suite; `Failure` and
    /// `Timeout` do.
    pub fn finalize(&mut self) {
        let end = chrono::Utc::now();
        self.end_time = Some(end);
        self.duration = (end - self.start_time).to_std().unwrap_or_default();

        if self.reports.is_empty() {
            self.overall_result = TestResult::Failure;
            return;
        }

        if self.reports.iter().any(|r| r.result.is_failure()) {
            self.overall_result = TestResult::Failure;
        } else {
            self.overall_result = TestResult::Success;
        }
    }
}

impl Default for TestSuite {
    fn default() -> Self {
        Self::new()
    }
}

/// Test execution engine. Owns the peripheral testers and dispatches through
/// the `PeripheralTester` contract, one peripheral at a time.
pub struct TestRunner {
    testers: Vec<Box<dyn PeripheralTester + Send + Sync>>,
    config: RunConfig,
    reporter: Box<dyn Reporter + Send + Sync>,
    interrupted: Arc<Mutex<bool>>,
}

impl TestRunner {
    pub fn new(
        testers: Vec<Box<dyn PeripheralTester + Send + Sync>>,
        config: RunConfig,
        reporter: Box<dyn Reporter + Send + Sync>,
    ) -> Self {
        Self {
            testers,
            config,
            reporter,
            interrupted: Arc::new(Mutex::new(false)),
        }
    }

    /// Set up interrupt handler. An interrupt stops the run between
    /// peripherals; a test already in progress finishes first.
    pub fn setup_interrupt_handler(&self) -> Result<()> {
        let interrupted = self.interrupted.clone();

        ctrlc::set_handler(move || {
            let mut flag = interrupted.lock().unwrap();
            *flag = true;
            println!("\nReceived interrupt signal...");
            println!("Stopping after the current peripheral test completes.");
        })
        .map_err(|e| BoardcheckError::UnexpectedError(format!("Failed to set Ctrl-C handler: {}", e)))?;

        Ok(())
    }

    fn is_interrupted(&self) -> bool {
        *self.interrupted.lock().unwrap()
    }

    /// Execute the selected test mode on every enabled peripheral.
    ///
    /// Unavailable peripherals are recorded as `Skipped` reports rather than
    /// exercised.
    pub fn execute(&mut self, mode: TestMode) -> Result<TestSuite> {
        let mut suite = TestSuite::new();

        self.reporter.report_start(&self.config);

        for tester in &self.testers {
            if self.is_interrupted() {
                break;
            }

            let name = tester.peripheral_name();

            if !tester.is_available() {
                self.reporter
                    .report_info(&format!("{} not available, skipping", name));
                suite.reports.push(TestReport::new(
                    TestResult::Skipped,
                    name,
                    format!("{} not available on this system", name),
                    std::time::Duration::from_secs(0),
                ));
                continue;
            }

            self.reporter.report_test_start(name);

            let start_time = Instant::now();
            let report = match mode {
                TestMode::Short => tester.short_test(),
                TestMode::Monitor => tester.monitor_test(self.config.monitor_duration),
            };

            log::debug!(
                "{} {:?} test finished in {:?}",
                name,
                mode,
                start_time.elapsed()
            );

            self.reporter.report_test_result(&report);
            suite.reports.push(report);
        }

        suite.finalize();
        self.reporter.report_suite_result(&suite);

        Ok(suite)
    }

    /// Execute with the interrupt handler installed.
    pub fn execute_all(&mut self, mode: TestMode) -> Result<TestSuite> {
        self.setup_interrupt_handler()?;

        self.reporter.report_info("Starting peripheral verification");

        let result = self.execute(mode);

        match &result {
            Ok(suite) => {
                self.reporter.report_info(&format!(
                    "All tests completed with result: {}",
                    suite.overall_result.label()
                ));
            }
            Err(e) => {
                self.reporter
                    .report_warning(&format!("Tests failed with error: {}", e));
            }
        }

        result
    }
}
