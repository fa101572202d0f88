use std::io::{self, Write};
use std::fs::File;
use serde_json::{json, Value};

use crate::core::report::TestReport;
use crate::core::config::RunConfig;
use crate::core::runner::TestSuite;
use crate::reporters::Reporter;

/// JSON reporter for machine-readable output
pub struct JsonReporter {
    output_file: Option<String>,
    verbose: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new(output_file: Option<String>, verbose: bool) -> Self {
        Self { output_file, verbose }
    }

    /// Write JSON to file or stdout
    fn write_json(&self, json_value: Value) -> io::Result<()> {
        let json_string = serde_json::to_string_pretty(&json_value)?;

        match &self.output_file {
            Some(path) => {
                let mut file = File::create(path)?;
                file.write_all(json_string.as_bytes())?;
            }
            None => {
                println!("{}", json_string);
            }
        }

        Ok(())
    }

    fn report_to_value(report: &TestReport) -> Value {
        json!({
            "peripheral": report.peripheral_name,
            "result": report.result.label(),
            "duration_ms": report.duration.as_millis() as u64,
            "timestamp": report.timestamp.to_rfc3339(),
            "details": report.details,
        })
    }
}

impl Reporter for JsonReporter {
    fn report_start(&self, config: &RunConfig) {
        if self.verbose && self.output_file.is_none() {
            let start_info = json!({
                "event": "run_start",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "config": {
                    "monitor_duration_seconds": config.monitor_duration.as_secs(),
                    "peripherals": {
                        "cpu": config.cpu_enabled,
                        "gpio": config.gpio_enabled,
                    }
                }
            });

            let _ = self.write_json(start_info);
        }
    }

    fn report_test_start(&self, peripheral_name: &str) {
        if self.verbose && self.output_file.is_none() {
            let test_start = json!({
                "event": "peripheral_start",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "peripheral": peripheral_name,
            });

            let _ = self.write_json(test_start);
        }
    }

    fn report_test_result(&self, report: &TestReport) {
        if self.verbose && self.output_file.is_none() {
            let mut value = Self::report_to_value(report);
            value["event"] = json!("peripheral_result");

            let _ = self.write_json(value);
        }
    }

    fn report_suite_result(&self, suite: &TestSuite) {
        let reports: Vec<Value> = suite.reports.iter()
            .map(Self::report_to_value)
            .collect();

        let final_result = json!({
            "summary": {
                "result": suite.overall_result.label(),
                "started": suite.start_time.to_rfc3339(),
                "duration_seconds": suite.duration.as_secs(),
                "peripherals_tested": suite.reports.len(),
            },
            "reports": reports,
        });

        if let Err(e) = self.write_json(final_result) {
            eprintln!("Error writing JSON output: {}", e);
        }
    }

    fn report_warning(&self, message: &str) {
        if self.verbose && self.output_file.is_none() {
            let warning = json!({
                "event": "warning",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "message": message,
            });

            let _ = self.write_json(warning);
        }
    }

    fn report_info(&self, message: &str) {
        if self.verbose && self.output_file.is_none() {
            let info = json!({
                "event": "info",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "message": message,
            });

            let _ = self.write_json(info);
        }
    }
}
