use std::io::{self, Write};
use std::fs::File;
use csv::Writer;

use crate::core::report::TestReport;
use crate::core::config::RunConfig;
use crate::core::runner::TestSuite;
use crate::reporters::Reporter;

/// CSV reporter: one row per peripheral report
pub struct CsvReporter {
    output_file: Option<String>,
}

impl CsvReporter {
    /// Create a new CSV reporter
    pub fn new(output_file: Option<String>) -> Self {
        Self { output_file }
    }

    fn make_writer(&self) -> io::Result<Writer<Box<dyn Write>>> {
        match &self.output_file {
            Some(path) => {
                let file = File::create(path)?;
                Ok(Writer::from_writer(Box::new(file) as Box<dyn Write>))
            }
            None => Ok(Writer::from_writer(Box::new(io::stdout()) as Box<dyn Write>)),
        }
    }

    fn write_suite(&self, suite: &TestSuite) -> io::Result<()> {
        let mut writer = self.make_writer()?;

        writer.write_record(["peripheral", "result", "duration_ms", "timestamp", "details"])?;

        for report in &suite.reports {
            let duration_ms = report.duration.as_millis().to_string();
            let timestamp = report.timestamp.to_rfc3339();
            // Details are multi-line; flatten for the cell.
            let details = report.details.replace('\n', "; ");

            writer.write_record([
                report.peripheral_name.as_str(),
                report.result.label(),
                duration_ms.as_str(),
                timestamp.as_str(),
                details.as_str(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Reporter for CsvReporter {
    fn report_start(&self, _config: &RunConfig) {}

    fn report_test_start(&self, _peripheral_name: &str) {}

    fn report_test_result(&self, _report: &TestReport) {}

    fn report_suite_result(&self, suite: &TestSuite) {
        if let Err(e) = self.write_suite(suite) {
            eprintln!("Error writing CSV output: {}", e);
        }
    }

    fn report_warning(&self, message: &str) {
        eprintln!("WARNING: {}", message);
    }

    fn report_info(&self, _message: &str) {}
}
