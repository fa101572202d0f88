use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::report::{TestReport, TestResult};
use crate::core::tester::PeripheralTester;

const CPUINFO_PATH: &str = "/proc/cpuinfo";
const CPUFREQ_MAX_PATH: &str = "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq";

/// Candidate thermal sensor paths, tried in order. The first readable,
/// parseable value wins.
const THERMAL_SENSOR_PATHS: &[&str] = &[
    "/sys/class/thermal/thermal_zone0/temp",
    "/sys/class/hwmon/hwmon0/temp1_input",
    "/proc/acpi/thermal_zone/THM0/temperature",
];

/// CPU description captured once at tester construction from static system
/// descriptors. The temperature sub-check re-reads the sensor live; this
/// cached value is only used for reporting.
#[derive(Debug, Clone)]
pub struct CpuInfo {
    pub model_name: String,
    pub cores: u32,
    pub architecture: String,
    pub frequency_mhz: f64,
    pub temperature_c: Option<f64>,
}

/// Tester for the CPU subsystem.
///
/// Data sources: `/proc/cpuinfo`, the cpufreq sysfs tree and the thermal-zone
/// sysfs tree, plus an in-process parallel benchmark.
pub struct CpuTester {
    info: CpuInfo,
    available: bool,
    thermal_paths: Vec<PathBuf>,
}

impl CpuTester {
    pub fn new() -> Self {
        Self::with_paths(
            Path::new(CPUINFO_PATH),
            Path::new(CPUFREQ_MAX_PATH),
            THERMAL_SENSOR_PATHS.iter().map(PathBuf::from).collect(),
        )
    }

    fn with_paths(cpuinfo: &Path, freq: &Path, thermal_paths: Vec<PathBuf>) -> Self {
        let available = cpuinfo.exists();
        let info = if available {
            read_cpu_info(cpuinfo, freq, &thermal_paths)
        } else {
            CpuInfo {
                model_name: String::new(),
                cores: 0,
                architecture: String::new(),
                frequency_mhz: 0.0,
                temperature_c: None,
            }
        };

        Self { info, available, thermal_paths }
    }

    /// The CPU description captured at construction.
    pub fn info(&self) -> &CpuInfo {
        &self.info
    }

    /// Prime computation sanity probe: every prime up to 10000 by trial
    /// division. This checks determinism of the arithmetic, not speed.
    fn benchmark_cpu(&self) -> TestResult {
        let primes = primes_up_to(10_000);

        if primes.last() != Some(&9973) {
            return TestResult::Failure;
        }

        TestResult::Success
    }

    /// Reads the thermal sensor live and classifies the value. The raw
    /// reading is returned alongside the verdict so callers report the same
    /// sample they judged.
    fn test_temperature(&self) -> (TestResult, Option<f64>) {
        let reading = read_temperature(&self.thermal_paths);
        (classify_temperature(reading), reading)
    }

    /// Spawns one task per logical core, each accumulating into its own slot
    /// of a shared buffer, and verifies every slot is nonzero after join.
    fn test_multi_core(&self) -> TestResult {
        let num_threads = num_cpus::get();
        if num_threads == 0 {
            return TestResult::NotSupported;
        }

        let results = run_core_tasks(num_threads);

        if results.iter().any(|&r| r == 0) {
            return TestResult::Failure;
        }

        TestResult::Success
    }

    /// Samples the thermal sensor once per second for the full duration and
    /// judges stability from the min/max spread of the successful samples.
    fn monitor_temperature(&self, duration: Duration) -> TestResult {
        let end_time = Instant::now() + duration;
        let mut samples = Vec::new();

        while Instant::now() < end_time {
            if let Some(temp) = read_temperature(&self.thermal_paths) {
                samples.push(temp);
            }

            thread::sleep(Duration::from_secs(1));
        }

        stability_verdict(&samples)
    }
}

impl Default for CpuTester {
    fn default() -> Self {
        Self::new()
    }
}

impl PeripheralTester for CpuTester {
    fn peripheral_name(&self) -> &'static str {
        "CPU"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn short_test(&self) -> TestReport {
        let start_time = Instant::now();

        if !self.available {
            return TestReport::new(
                TestResult::NotSupported,
                self.peripheral_name(),
                "CPU information not available",
                Duration::from_secs(0),
            );
        }

        let mut details = String::new();
        let mut all_passed = true;

        details.push_str(&format!("CPU Model: {}\n", self.info.model_name));
        details.push_str(&format!("Cores: {}\n", self.info.cores));
        details.push_str(&format!("Architecture: {}\n", self.info.architecture));
        details.push_str(&format!("Frequency: {} MHz\n", self.info.frequency_mhz));

        let benchmark_result = self.benchmark_cpu();
        details.push_str(&format!("Benchmark: {}\n", pass_fail(benchmark_result)));
        if benchmark_result != TestResult::Success {
            all_passed = false;
        }

        let (temp_result, temp_reading) = self.test_temperature();
        details.push_str(&format!("Temperature: {}", pass_fail(temp_result)));
        if temp_result == TestResult::Success {
            if let Some(temp) = temp_reading {
                details.push_str(&format!(" ({:.1}°C)", temp));
            }
        }
        details.push('\n');
        // A missing thermal sensor does not fail the CPU aggregate; only an
        // implausible reading does.
        if temp_result != TestResult::Success && temp_result != TestResult::NotSupported {
            all_passed = false;
        }

        let multi_core_result = self.test_multi_core();
        details.push_str(&format!("Multi-core: {}\n", pass_fail(multi_core_result)));
        if multi_core_result != TestResult::Success {
            all_passed = false;
        }

        let overall = if all_passed { TestResult::Success } else { TestResult::Failure };
        TestReport::new(overall, self.peripheral_name(), details, start_time.elapsed())
    }

    fn monitor_test(&self, duration: Duration) -> TestReport {
        let start_time = Instant::now();

        if !self.available {
            return TestReport::new(
                TestResult::NotSupported,
                self.peripheral_name(),
                "CPU information not available",
                Duration::from_secs(0),
            );
        }

        let result = self.monitor_temperature(duration);

        let details = format!(
            "CPU temperature monitored for {} seconds",
            duration.as_secs()
        );
        TestReport::new(result, self.peripheral_name(), details, start_time.elapsed())
    }
}

fn pass_fail(result: TestResult) -> &'static str {
    if result == TestResult::Success { "PASS" } else { "FAIL" }
}

fn read_cpu_info(cpuinfo: &Path, freq: &Path, thermal_paths: &[PathBuf]) -> CpuInfo {
    let contents = fs::read_to_string(cpuinfo).unwrap_or_default();
    let (model_name, cores, architecture) = parse_cpuinfo(&contents);

    CpuInfo {
        model_name,
        cores,
        architecture,
        frequency_mhz: read_max_frequency_mhz(freq),
        temperature_c: read_temperature(thermal_paths),
    }
}

/// Extracts `model name`, `cpu cores` and `CPU architecture` from
/// `/proc/cpuinfo` contents. The first occurrence of each field wins.
fn parse_cpuinfo(contents: &str) -> (String, u32, String) {
    let mut model_name = None;
    let mut cores = None;
    let mut architecture = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "model name" if model_name.is_none() => model_name = Some(value.to_string()),
            "cpu cores" if cores.is_none() => cores = value.parse().ok(),
            "CPU architecture" if architecture.is_none() => {
                architecture = Some(value.to_string())
            }
            _ => {}
        }
    }

    (
        model_name.unwrap_or_default(),
        cores.unwrap_or(0),
        architecture.unwrap_or_default(),
    )
}

/// Reads the cpufreq maximum frequency and converts kHz to MHz. An unreadable
/// or malformed value yields `0.0`, not an error.
fn read_max_frequency_mhz(path: &Path) -> f64 {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(|khz| khz / 1000.0)
        .unwrap_or(0.0)
}

/// Tries each candidate sensor path in order and returns the first
/// successfully parsed reading, normalized to degrees Celsius. Returns `None`
/// when no candidate is readable.
fn read_temperature(paths: &[PathBuf]) -> Option<f64> {
    for path in paths {
        let Ok(contents) = fs::read_to_string(path) else {
            continue;
        };
        if let Ok(raw) = contents.trim().parse::<f64>() {
            return Some(normalize_temperature(raw));
        }
    }

    None
}

/// Kernel sensors report either degrees or millidegrees; values above 1000
/// are taken to be millidegrees.
fn normalize_temperature(raw: f64) -> f64 {
    if raw > 1000.0 {
        raw / 1000.0
    } else {
        raw
    }
}

fn classify_temperature(reading: Option<f64>) -> TestResult {
    let Some(temp) = reading else {
        return TestResult::NotSupported;
    };

    if !(0.0..=100.0).contains(&temp) {
        return TestResult::Failure;
    }

    TestResult::Success
}

/// Runs one scoped thread per requested task, each writing only to its own
/// slot of the result buffer. The accumulation depends on both the task index
/// and the loop variable, so every slot ends up nonzero.
fn run_core_tasks(num_tasks: usize) -> Vec<u64> {
    let mut results = vec![0u64; num_tasks];

    thread::scope(|s| {
        for (i, slot) in results.iter_mut().enumerate() {
            s.spawn(move || {
                let mut sum = 0u64;
                for j in 0..1000u64 {
                    sum += j * i as u64 + j;
                }
                *slot = sum;
            });
        }
    });

    results
}

/// All primes up to `limit` by trial division up to the square root.
fn primes_up_to(limit: u32) -> Vec<u32> {
    let mut primes = Vec::new();

    for num in 2..=limit {
        let mut is_prime = true;
        let mut i = 2;
        while i * i <= num {
            if num % i == 0 {
                is_prime = false;
                break;
            }
            i += 1;
        }
        if is_prime {
            primes.push(num);
        }
    }

    primes
}

/// Stability verdict over successful monitoring samples: no samples means the
/// sensor is absent; otherwise the min/max spread must stay within 20 °C.
fn stability_verdict(samples: &[f64]) -> TestResult {
    if samples.is_empty() {
        return TestResult::NotSupported;
    }

    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if max - min <= 20.0 {
        TestResult::Success
    } else {
        TestResult::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_primes_end_at_9973() {
        let primes = primes_up_to(10_000);
        assert!(!primes.is_empty());
        assert_eq!(primes.last(), Some(&9973));
        assert_eq!(primes.len(), 1229);
    }

    #[test]
    fn test_primes_small_limits() {
        assert_eq!(primes_up_to(1), Vec::<u32>::new());
        assert_eq!(primes_up_to(2), vec![2]);
        assert_eq!(primes_up_to(10), vec![2, 3, 5, 7]);
    }

    #[test]
    fn test_normalize_temperature() {
        // Values above 1000 are millidegrees.
        assert_eq!(normalize_temperature(45_000.0), 45.0);
        assert_eq!(normalize_temperature(1001.0), 1.001);
        // At or below 1000 the value is already in degrees.
        assert_eq!(normalize_temperature(1000.0), 1000.0);
        assert_eq!(normalize_temperature(45.0), 45.0);
        assert_eq!(normalize_temperature(0.0), 0.0);
    }

    #[test]
    fn test_classify_temperature() {
        assert_eq!(classify_temperature(None), TestResult::NotSupported);
        assert_eq!(classify_temperature(Some(-5.0)), TestResult::Failure);
        assert_eq!(classify_temperature(Some(120.0)), TestResult::Failure);
        assert_eq!(classify_temperature(Some(0.0)), TestResult::Success);
        assert_eq!(classify_temperature(Some(45.0)), TestResult::Success);
        assert_eq!(classify_temperature(Some(100.0)), TestResult::Success);
    }

    #[test]
    fn test_parse_cpuinfo_first_match_wins() {
        let contents = "\
processor\t: 0
model name\t: ARM Cortex-A76
cpu cores\t: 4
CPU architecture: 8
processor\t: 1
model name\t: bogus second entry
cpu cores\t: 99
";
        let (model, cores, arch) = parse_cpuinfo(contents);
        assert_eq!(model, "ARM Cortex-A76");
        assert_eq!(cores, 4);
        assert_eq!(arch, "8");
    }

    #[test]
    fn test_parse_cpuinfo_missing_fields() {
        let (model, cores, arch) = parse_cpuinfo("processor\t: 0\n");
        assert_eq!(model, "");
        assert_eq!(cores, 0);
        assert_eq!(arch, "");
    }

    #[test]
    fn test_read_max_frequency() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cpuinfo_max_freq");

        std::fs::write(&path, "1800000\n").unwrap();
        assert_eq!(read_max_frequency_mhz(&path), 1800.0);

        std::fs::write(&path, "garbage\n").unwrap();
        assert_eq!(read_max_frequency_mhz(&path), 0.0);

        assert_eq!(read_max_frequency_mhz(&dir.path().join("missing")), 0.0);
    }

    #[test]
    fn test_read_temperature_first_readable_wins() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("zone_a");
        let present = dir.path().join("zone_b");

        let mut file = std::fs::File::create(&present).unwrap();
        writeln!(file, "52000").unwrap();

        let temp = read_temperature(&[missing, present]);
        assert_eq!(temp, Some(52.0));
    }

    #[test]
    fn test_read_temperature_none_readable() {
        let dir = TempDir::new().unwrap();
        let paths = vec![dir.path().join("a"), dir.path().join("b")];
        assert_eq!(read_temperature(&paths), None);

        // Present but unparseable counts as unreadable.
        std::fs::write(&paths[0], "not a number").unwrap();
        assert_eq!(read_temperature(&paths), None);
    }

    #[test]
    fn test_run_core_tasks_all_slots_nonzero() {
        for n in [1, 2, 4, 8] {
            let results = run_core_tasks(n);
            assert_eq!(results.len(), n);
            assert!(results.iter().all(|&r| r != 0), "zero slot with n={}", n);
        }
    }

    #[test]
    fn test_stability_verdict() {
        assert_eq!(stability_verdict(&[]), TestResult::NotSupported);
        assert_eq!(stability_verdict(&[40.0, 42.0, 45.0]), TestResult::Success);
        assert_eq!(stability_verdict(&[30.0, 55.0]), TestResult::Failure);
        // Exactly 20 degrees of spread is still acceptable.
        assert_eq!(stability_verdict(&[30.0, 50.0]), TestResult::Success);
        assert_eq!(stability_verdict(&[47.5]), TestResult::Success);
    }

    #[test]
    fn test_benchmark_passes() {
        let tester = CpuTester::new();
        assert_eq!(tester.benchmark_cpu(), TestResult::Success);
    }

    #[test]
    fn test_unavailable_tester_reports_not_supported() {
        let dir = TempDir::new().unwrap();
        let tester = CpuTester::with_paths(
            &dir.path().join("no_cpuinfo"),
            &dir.path().join("no_freq"),
            vec![],
        );

        assert!(!tester.is_available());

        let report = tester.short_test();
        assert_eq!(report.result, TestResult::NotSupported);
        assert_eq!(report.peripheral_name, "CPU");

        let report = tester.monitor_test(Duration::from_secs(1));
        assert_eq!(report.result, TestResult::NotSupported);
    }

    #[test]
    fn test_info_captured_from_fixture() {
        let dir = TempDir::new().unwrap();
        let cpuinfo = dir.path().join("cpuinfo");
        let freq = dir.path().join("cpuinfo_max_freq");
        let thermal = dir.path().join("temp");

        std::fs::write(&cpuinfo, "model name\t: Test CPU\ncpu cores\t: 2\nCPU architecture: 8\n")
            .unwrap();
        std::fs::write(&freq, "2400000\n").unwrap();
        std::fs::write(&thermal, "48000\n").unwrap();

        let tester = CpuTester::with_paths(&cpuinfo, &freq, vec![thermal]);
        assert!(tester.is_available());

        let info = tester.info();
        assert_eq!(info.model_name, "Test CPU");
        assert_eq!(info.cores, 2);
        assert_eq!(info.architecture, "8");
        assert_eq!(info.frequency_mhz, 2400.0);
        assert_eq!(info.temperature_c, Some(48.0));
    }

    #[test]
    fn test_short_test_passes_without_thermal_sensor() {
        let dir = TempDir::new().unwrap();
        let cpuinfo = dir.path().join("cpuinfo");
        let freq = dir.path().join("cpuinfo_max_freq");

        std::fs::write(&cpuinfo, "model name\t: Test CPU\ncpu cores\t: 2\nCPU architecture: 8\n")
            .unwrap();
        std::fs::write(&freq, "1500000\n").unwrap();

        let tester = CpuTester::with_paths(&cpuinfo, &freq, vec![]);
        assert_eq!(tester.test_temperature(), (TestResult::NotSupported, None));

        // A board without a thermal sensor still passes the aggregate when
        // the benchmark and multi-core checks succeed.
        let report = tester.short_test();
        assert_eq!(report.result, TestResult::Success);
        assert!(report.details.contains("Benchmark: PASS"));
        assert!(report.details.contains("Multi-core: PASS"));
    }

    #[test]
    fn test_short_test_reports_judged_temperature() {
        let dir = TempDir::new().unwrap();
        let cpuinfo = dir.path().join("cpuinfo");
        let freq = dir.path().join("cpuinfo_max_freq");
        let thermal = dir.path().join("temp");

        std::fs::write(&cpuinfo, "model name\t: Test CPU\ncpu cores\t: 2\nCPU architecture: 8\n")
            .unwrap();
        std::fs::write(&freq, "1500000\n").unwrap();
        std::fs::write(&thermal, "48000\n").unwrap();

        let tester = CpuTester::with_paths(&cpuinfo, &freq, vec![thermal]);
        let (result, reading) = tester.test_temperature();
        assert_eq!(result, TestResult::Success);
        assert_eq!(reading, Some(48.0));

        let report = tester.short_test();
        assert_eq!(report.result, TestResult::Success);
        assert!(report.details.contains("Temperature: PASS (48.0°C)"));
    }

    #[test]
    fn test_monitor_without_sensor_is_not_supported() {
        let dir = TempDir::new().unwrap();
        let cpuinfo = dir.path().join("cpuinfo");
        std::fs::write(&cpuinfo, "model name\t: Test CPU\n").unwrap();

        let tester = CpuTester::with_paths(&cpuinfo, &dir.path().join("freq"), vec![]);
        let report = tester.monitor_test(Duration::from_millis(10));
        assert_eq!(report.result, TestResult::NotSupported);
        assert!(report.details.contains("monitored"));
    }
}
