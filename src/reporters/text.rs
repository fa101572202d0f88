use std::io::{self, Write};
use colored::*;
use chrono::Local;

use crate::core::report::{TestReport, TestResult};
use crate::core::config::RunConfig;
use crate::core::runner::TestSuite;
use crate::reporters::Reporter;

/// Text reporter for console output
pub struct TextReporter {
    verbose: bool,
    quiet: bool,
}

impl TextReporter {
    /// Create a new text reporter
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// Format a duration in a human-readable format
    fn format_duration(&self, duration: std::time::Duration) -> String {
        let total_secs = duration.as_secs();
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else if seconds > 0 {
            format!("{}s", seconds)
        } else {
            format!("{}ms", duration.as_millis())
        }
    }

    /// Format a test result with color
    fn format_result(&self, result: TestResult) -> ColoredString {
        match result {
            TestResult::Success => "✓ PASS".green().bold(),
            TestResult::Failure => "✗ FAIL".red().bold(),
            TestResult::NotSupported => "– NOT SUPPORTED".yellow().bold(),
            TestResult::Timeout => "⏱ TIMEOUT".red(),
            TestResult::Skipped => "⏸ SKIPPED".blue().bold(),
        }
    }
}

impl Reporter for TextReporter {
    fn report_start(&self, config: &RunConfig) {
        if self.quiet {
            return;
        }

        println!("{}", "PERIPHERAL VERIFICATION STARTING".bold());
        println!("================================");

        let now = Local::now();
        println!("Started: {}", now.format("%Y-%m-%d %H:%M:%S %Z"));

        if self.verbose {
            println!("\nRun Configuration:");
            println!("  Monitor Duration: {:?}", config.monitor_duration);
            println!("\nEnabled Peripherals:");
            println!("  CPU: {}", if config.cpu_enabled { "yes".green() } else { "no".red() });
            println!("  GPIO: {}", if config.gpio_enabled { "yes".green() } else { "no".red() });
        }

        println!("\nRunning tests...\n");
        io::stdout().flush().unwrap();
    }

    fn report_test_start(&self, peripheral_name: &str) {
        if self.quiet {
            return;
        }

        if self.verbose {
            println!("Testing peripheral: {}", peripheral_name.cyan());
            io::stdout().flush().unwrap();
        } else {
            print!("Testing {}... ", peripheral_name.cyan());
            io::stdout().flush().unwrap();
        }
    }

    fn report_test_result(&self, report: &TestReport) {
        if self.quiet {
            return;
        }

        if self.verbose {
            println!("{} completed: {}",
                report.peripheral_name.cyan(),
                self.format_result(report.result));
            println!("  Duration: {}", self.format_duration(report.duration));

            if !report.details.is_empty() {
                println!("  Details:");
                for line in report.details.lines() {
                    println!("    {}", line);
                }
            }

            println!();
        } else {
            println!("{}", self.format_result(report.result));
        }

        io::stdout().flush().unwrap();
    }

    fn report_suite_result(&self, suite: &TestSuite) {
        if self.quiet {
            // In quiet mode, just print the overall result.
            println!("{}", self.format_result(suite.overall_result));
            return;
        }

        println!("\n{}", "PERIPHERAL VERIFICATION RESULTS".bold());
        println!("===============================");
        println!("Started: {}", suite.start_time.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("Duration: {}", self.format_duration(suite.duration));
        println!();

        let max_name_len = suite.reports.iter()
            .map(|r| r.peripheral_name.len())
            .max()
            .unwrap_or(10);

        for report in &suite.reports {
            println!("{}:{}{}",
                report.peripheral_name.cyan().bold(),
                " ".repeat(max_name_len - report.peripheral_name.len() + 2),
                self.format_result(report.result));
        }

        println!("\n{}: {}",
            "OVERALL RESULT".bold(),
            self.format_result(suite.overall_result));
    }

    fn report_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        eprintln!("{}: {}", "WARNING".yellow().bold(), message);
    }

    fn report_info(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.verbose {
            println!("{}: {}", "INFO".blue().bold(), message);
        }
    }
}
