use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crate::core::error::{BoardcheckError, Result};
use crate::core::report::{TestReport, TestResult};
use crate::core::tester::PeripheralTester;

const GPIO_SYSFS_ROOT: &str = "/sys/class/gpio";
const PWM_CHIP_PATH: &str = "/sys/class/pwm/pwmchip0";

const I2C_DEVICES: &[&str] = &["/dev/i2c-0", "/dev/i2c-1"];
const SPI_DEVICES: &[&str] = &["/dev/spidev0.0", "/dev/spidev0.1"];
const UART_DEVICES: &[&str] = &["/dev/ttyAMA0", "/dev/ttyS0"];

/// Pins exercised by the digital I/O sub-check. Safe general-purpose pins on
/// the 40-pin header.
const DIGITAL_IO_PINS: &[u32] = &[2, 3, 4];
/// PWM-capable pin used by the PWM sub-check (hardware PWM0).
const PWM_TEST_PIN: u32 = 18;
/// Input pin polled by the stability monitor.
const MONITOR_PIN: u32 = 2;

/// Sysfs creates the gpio<N> directory asynchronously after an export write.
const EXPORT_SETTLE: Duration = Duration::from_millis(100);
const WRITE_SETTLE: Duration = Duration::from_millis(10);
const MONITOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Intended function of a header pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioMode {
    Input,
    Output,
    Pwm,
    I2c,
    Spi,
    Uart,
}

/// A static catalog entry describing one pin of the board's header layout.
///
/// This is configuration data, never hardware state. The sub-checks pick
/// specific pins; the catalog documents the full header.
#[derive(Debug, Clone)]
pub struct GpioPin {
    pub number: u32,
    pub mode: GpioMode,
    pub pull_up: bool,
    pub pull_down: bool,
    pub pwm_frequency: u32,
    pub pwm_duty_cycle: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Tester for the GPIO subsystem and its associated bus interfaces.
///
/// Uses the GPIO sysfs export/unexport/direction/value protocol for pin
/// exercising and device-node presence checks for I2C/SPI/UART/PWM. All sysfs
/// and device paths are instance data so a nonstandard layout can be
/// substituted.
pub struct GpioTester {
    gpio_root: PathBuf,
    pwm_chip: PathBuf,
    i2c_devices: Vec<PathBuf>,
    spi_devices: Vec<PathBuf>,
    uart_devices: Vec<PathBuf>,
    test_pins: Vec<GpioPin>,
    available: bool,
}

/// An exported pin lease. Exporting through sysfs hands the pin to user
/// space; dropping the lease writes the unexport control file, so no exit
/// path can leave the pin exported.
struct ExportedPin<'a> {
    tester: &'a GpioTester,
    number: u32,
}

impl ExportedPin<'_> {
    fn set_direction(&self, direction: Direction) -> Result<()> {
        self.tester.set_pin_direction(self.number, direction)
    }

    fn write(&self, value: u8) -> Result<()> {
        self.tester.write_pin_value(self.number, value)
    }

    fn read(&self) -> Result<u8> {
        self.tester.read_pin_value(self.number)
    }
}

impl Drop for ExportedPin<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.tester.unexport_pin(self.number) {
            log::warn!("failed to unexport gpio{}: {}", self.number, e);
        }
    }
}

impl GpioTester {
    pub fn new() -> Self {
        Self::with_layout(
            PathBuf::from(GPIO_SYSFS_ROOT),
            PathBuf::from(PWM_CHIP_PATH),
            I2C_DEVICES.iter().map(PathBuf::from).collect(),
            SPI_DEVICES.iter().map(PathBuf::from).collect(),
            UART_DEVICES.iter().map(PathBuf::from).collect(),
        )
    }

    fn with_layout(
        gpio_root: PathBuf,
        pwm_chip: PathBuf,
        i2c_devices: Vec<PathBuf>,
        spi_devices: Vec<PathBuf>,
        uart_devices: Vec<PathBuf>,
    ) -> Self {
        let available = gpio_root.exists();

        Self {
            gpio_root,
            pwm_chip,
            i2c_devices,
            spi_devices,
            uart_devices,
            test_pins: default_pin_catalog(),
            available,
        }
    }

    /// The header pin catalog this tester was configured with.
    pub fn pins(&self) -> &[GpioPin] {
        &self.test_pins
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.gpio_root.join(format!("gpio{}", pin))
    }

    /// Writes the pin number to the export control file and verifies the pin
    /// directory appears. On success the returned lease unexports the pin
    /// when dropped.
    fn export_pin(&self, pin: u32) -> Result<ExportedPin<'_>> {
        fs::write(self.gpio_root.join("export"), pin.to_string())?;

        thread::sleep(EXPORT_SETTLE);

        if !self.pin_dir(pin).exists() {
            return Err(BoardcheckError::Sysfs(format!(
                "gpio{} directory missing after export",
                pin
            )));
        }

        Ok(ExportedPin { tester: self, number: pin })
    }

    fn unexport_pin(&self, pin: u32) -> Result<()> {
        fs::write(self.gpio_root.join("unexport"), pin.to_string())?;
        Ok(())
    }

    fn set_pin_direction(&self, pin: u32, direction: Direction) -> Result<()> {
        fs::write(self.pin_dir(pin).join("direction"), direction.as_str())?;
        Ok(())
    }

    fn write_pin_value(&self, pin: u32, value: u8) -> Result<()> {
        fs::write(
            self.pin_dir(pin).join("value"),
            if value == 0 { "0" } else { "1" },
        )?;
        Ok(())
    }

    fn read_pin_value(&self, pin: u32) -> Result<u8> {
        let contents = fs::read_to_string(self.pin_dir(pin).join("value"))?;
        match contents.trim() {
            "0" => Ok(0),
            "1" => Ok(1),
            other => Err(BoardcheckError::Sysfs(format!(
                "gpio{} value is not 0/1: {:?}",
                pin, other
            ))),
        }
    }

    /// Runs the export/configure/exercise/release sequence on each digital
    /// test pin. Any step failure aborts that pin and fails the sub-check;
    /// the lease unexports the pin on every exit path.
    fn test_digital_io(&self) -> TestResult {
        for &pin in DIGITAL_IO_PINS {
            if self.exercise_pin(pin).is_err() {
                return TestResult::Failure;
            }
        }

        TestResult::Success
    }

    fn exercise_pin(&self, pin: u32) -> Result<()> {
        let pin = self.export_pin(pin)?;

        pin.set_direction(Direction::Out)?;
        pin.write(1)?;
        thread::sleep(WRITE_SETTLE);
        pin.write(0)?;

        pin.set_direction(Direction::In)?;
        pin.read()?;

        Ok(())
    }

    /// Exports the PWM-capable pin and checks for a PWM controller. A failed
    /// export is a failure; a missing controller means the overlay is not
    /// enabled on this board.
    fn test_pwm(&self) -> TestResult {
        let _pin = match self.export_pin(PWM_TEST_PIN) {
            Ok(pin) => pin,
            Err(_) => return TestResult::Failure,
        };

        if self.pwm_chip.exists() {
            TestResult::Success
        } else {
            TestResult::NotSupported
        }
    }

    fn test_i2c(&self) -> TestResult {
        probe_device_nodes(&self.i2c_devices)
    }

    fn test_spi(&self) -> TestResult {
        probe_device_nodes(&self.spi_devices)
    }

    fn test_uart(&self) -> TestResult {
        probe_device_nodes(&self.uart_devices)
    }

    /// Polls one input pin on a fixed cadence for the whole duration and
    /// requires at least 95% of the reads to succeed.
    fn monitor_stability(&self, duration: Duration) -> TestResult {
        let pin = match self.export_pin(MONITOR_PIN) {
            Ok(pin) => pin,
            Err(_) => return TestResult::Failure,
        };
        if pin.set_direction(Direction::In).is_err() {
            return TestResult::Failure;
        }

        let end_time = Instant::now() + duration;
        let mut successful = 0u64;
        let mut attempted = 0u64;

        while Instant::now() < end_time {
            if pin.read().is_ok() {
                successful += 1;
            }
            attempted += 1;

            thread::sleep(MONITOR_POLL_INTERVAL);
        }

        drop(pin);

        stability_ratio_verdict(successful, attempted)
    }
}

impl Default for GpioTester {
    fn default() -> Self {
        Self::new()
    }
}

impl PeripheralTester for GpioTester {
    fn peripheral_name(&self) -> &'static str {
        "GPIO"
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
                "GPIO sysfs interface not available",
                Duration::from_secs(0),
            );
        }

        let sub_checks = [
            ("Digital I/O", self.test_digital_io()),
            ("PWM", self.test_pwm()),
            ("I2C", self.test_i2c()),
            ("SPI", self.test_spi()),
            ("UART", self.test_uart()),
        ];

        let mut details = String::new();
        let mut all_passed = true;

        // Unlike the CPU temperature check, an absent interface counts
        // against the GPIO aggregate.
        for (name, result) in &sub_checks {
            details.push_str(&format!("{}: {}\n", name, result.label()));
            if *result != TestResult::Success {
                all_passed = false;
            }
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
                "GPIO sysfs interface not available",
                Duration::from_secs(0),
            );
        }

        let result = self.monitor_stability(duration);

        let details = format!(
            "GPIO stability monitored for {} seconds",
            duration.as_secs()
        );
        TestReport::new(result, self.peripheral_name(), details, start_time.elapsed())
    }
}

/// 40-pin header layout: pins 2 through 27 with their intended function.
fn default_pin_catalog() -> Vec<GpioPin> {
    (2..=27)
        .map(|number| {
            let mode = match number {
                12 | 13 | 18 => GpioMode::Pwm,
                14 | 15 => GpioMode::Uart,
                19 | 20 | 21 | 23 | 24 => GpioMode::Spi,
                _ => GpioMode::Output,
            };
            let (pwm_frequency, pwm_duty_cycle) =
                if mode == GpioMode::Pwm { (1000, 50) } else { (0, 0) };

            GpioPin {
                number,
                mode,
                pull_up: false,
                pull_down: false,
                pwm_frequency,
                pwm_duty_cycle,
            }
        })
        .collect()
}

/// Presence probe over a ranked list of device-node candidates. No bus
/// transaction is performed.
fn probe_device_nodes(candidates: &[PathBuf]) -> TestResult {
    if candidates.iter().any(|path| path.exists()) {
        TestResult::Success
    } else {
        TestResult::NotSupported
    }
}

fn stability_ratio_verdict(successful: u64, attempted: u64) -> TestResult {
    if attempted == 0 {
        return TestResult::NotSupported;
    }

    let ratio = successful as f64 / attempted as f64;
    if ratio >= 0.95 {
        TestResult::Success
    } else {
        TestResult::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Fake sysfs tree: a gpio root with writable export/unexport control
    /// files. Pins must be provisioned explicitly since no kernel creates
    /// their directories.
    fn fixture() -> (TempDir, GpioTester) {
        let dir = TempDir::new().unwrap();
        let gpio_root = dir.path().join("gpio");
        fs::create_dir_all(&gpio_root).unwrap();
        fs::write(gpio_root.join("export"), "").unwrap();
        fs::write(gpio_root.join("unexport"), "").unwrap();

        let tester = GpioTester::with_layout(
            gpio_root,
            dir.path().join("pwmchip0"),
            vec![dir.path().join("i2c-1")],
            vec![dir.path().join("spidev0.0")],
            vec![dir.path().join("ttyS0")],
        );

        (dir, tester)
    }

    fn provision_pin(tester: &GpioTester, pin: u32) {
        let pin_dir = tester.pin_dir(pin);
        fs::create_dir_all(&pin_dir).unwrap();
        fs::write(pin_dir.join("direction"), "in").unwrap();
        fs::write(pin_dir.join("value"), "0").unwrap();
    }

    fn unexport_file(tester: &GpioTester) -> String {
        fs::read_to_string(tester.gpio_root.join("unexport")).unwrap()
    }

    #[test]
    fn test_pin_catalog_layout() {
        let catalog = default_pin_catalog();
        assert_eq!(catalog.len(), 26);
        assert_eq!(catalog.first().unwrap().number, 2);
        assert_eq!(catalog.last().unwrap().number, 27);

        let mode_of = |n: u32| catalog.iter().find(|p| p.number == n).unwrap().mode;
        assert_eq!(mode_of(18), GpioMode::Pwm);
        assert_eq!(mode_of(14), GpioMode::Uart);
        assert_eq!(mode_of(21), GpioMode::Spi);
        assert_eq!(mode_of(17), GpioMode::Output);

        let pwm18 = catalog.iter().find(|p| p.number == 18).unwrap();
        assert_eq!(pwm18.pwm_frequency, 1000);
        assert_eq!(pwm18.pwm_duty_cycle, 50);
    }

    #[test]
    fn test_export_and_release() {
        let (_dir, tester) = fixture();
        provision_pin(&tester, 2);

        {
            let pin = tester.export_pin(2).unwrap();
            assert_eq!(pin.number, 2);
        }

        // Dropping the lease writes the unexport control file.
        assert_eq!(unexport_file(&tester), "2");
    }

    #[test]
    fn test_export_fails_without_pin_directory() {
        let (_dir, tester) = fixture();

        // The export write succeeds but no gpio5 directory appears.
        assert!(tester.export_pin(5).is_err());
        assert_eq!(unexport_file(&tester), "");
    }

    #[test]
    fn test_export_denied() {
        let dir = TempDir::new().unwrap();
        let gpio_root = dir.path().join("gpio");
        fs::create_dir_all(&gpio_root).unwrap();
        // No export control file at all.

        let tester = GpioTester::with_layout(
            gpio_root,
            dir.path().join("pwmchip0"),
            vec![],
            vec![],
            vec![],
        );

        assert!(tester.export_pin(2).is_err());
        assert_eq!(tester.test_digital_io(), TestResult::Failure);
        // Nothing was exported, so nothing may be left behind.
        assert!(!tester.pin_dir(2).exists());
    }

    #[test]
    fn test_read_pin_value_parsing() {
        let (_dir, tester) = fixture();
        provision_pin(&tester, 2);

        fs::write(tester.pin_dir(2).join("value"), "1\n").unwrap();
        assert_eq!(tester.read_pin_value(2).unwrap(), 1);

        fs::write(tester.pin_dir(2).join("value"), "0").unwrap();
        assert_eq!(tester.read_pin_value(2).unwrap(), 0);

        fs::write(tester.pin_dir(2).join("value"), "garbage").unwrap();
        assert!(tester.read_pin_value(2).is_err());
    }

    #[test]
    fn test_digital_io_round_trip() {
        let (_dir, tester) = fixture();
        for pin in [2, 3, 4] {
            provision_pin(&tester, pin);
        }

        assert_eq!(tester.test_digital_io(), TestResult::Success);

        // Each sequence ends with the pin configured back as an input and
        // unexported.
        for pin in [2, 3, 4] {
            let direction = fs::read_to_string(tester.pin_dir(pin).join("direction")).unwrap();
            assert_eq!(direction, "in");
        }
        assert_eq!(unexport_file(&tester), "4");
    }

    #[test]
    fn test_digital_io_aborts_on_missing_pin() {
        let (_dir, tester) = fixture();
        provision_pin(&tester, 2);
        // Pins 3 and 4 never appear, so their export fails.

        assert_eq!(tester.test_digital_io(), TestResult::Failure);
        // Pin 2 completed its cycle and was released before the abort.
        assert_eq!(unexport_file(&tester), "2");
    }

    #[test]
    fn test_pwm_present() {
        let (dir, tester) = fixture();
        provision_pin(&tester, PWM_TEST_PIN);
        fs::create_dir_all(dir.path().join("pwmchip0")).unwrap();

        assert_eq!(tester.test_pwm(), TestResult::Success);
        assert_eq!(unexport_file(&tester), "18");
    }

    #[test]
    fn test_pwm_controller_absent() {
        let (_dir, tester) = fixture();
        provision_pin(&tester, PWM_TEST_PIN);

        assert_eq!(tester.test_pwm(), TestResult::NotSupported);
        // The pin is released in the not-supported case too.
        assert_eq!(unexport_file(&tester), "18");
    }

    #[test]
    fn test_pwm_export_failure() {
        let (_dir, tester) = fixture();
        // Pin 18 never provisioned, so the export cannot be verified.
        assert_eq!(tester.test_pwm(), TestResult::Failure);
    }

    #[test]
    fn test_device_node_probes() {
        let (dir, tester) = fixture();

        assert_eq!(tester.test_i2c(), TestResult::NotSupported);
        assert_eq!(tester.test_spi(), TestResult::NotSupported);
        assert_eq!(tester.test_uart(), TestResult::NotSupported);

        fs::write(dir.path().join("i2c-1"), "").unwrap();
        fs::write(dir.path().join("ttyS0"), "").unwrap();

        assert_eq!(tester.test_i2c(), TestResult::Success);
        assert_eq!(tester.test_spi(), TestResult::NotSupported);
        assert_eq!(tester.test_uart(), TestResult::Success);
    }

    #[test]
    fn test_stability_ratio_verdict() {
        // Zero attempted reads is an absent peripheral, not a 0/0 success.
        assert_eq!(stability_ratio_verdict(0, 0), TestResult::NotSupported);
        assert_eq!(stability_ratio_verdict(100, 100), TestResult::Success);
        assert_eq!(stability_ratio_verdict(95, 100), TestResult::Success);
        assert_eq!(stability_ratio_verdict(94, 100), TestResult::Failure);
        assert_eq!(stability_ratio_verdict(0, 10), TestResult::Failure);
    }

    #[test]
    fn test_monitor_stability_on_fixture() {
        let (_dir, tester) = fixture();
        provision_pin(&tester, MONITOR_PIN);

        let result = tester.monitor_stability(Duration::from_millis(300));
        assert_eq!(result, TestResult::Success);
        assert_eq!(unexport_file(&tester), "2");
    }

    #[test]
    fn test_monitor_fails_before_polling_without_export() {
        let dir = TempDir::new().unwrap();
        let gpio_root = dir.path().join("gpio");
        fs::create_dir_all(&gpio_root).unwrap();

        let tester = GpioTester::with_layout(
            gpio_root,
            dir.path().join("pwmchip0"),
            vec![],
            vec![],
            vec![],
        );

        assert_eq!(
            tester.monitor_stability(Duration::from_secs(1)),
            TestResult::Failure
        );
    }

    #[test]
    fn test_short_test_all_interfaces_present() {
        let (dir, tester) = fixture();
        for pin in [2, 3, 4, PWM_TEST_PIN] {
            provision_pin(&tester, pin);
        }
        fs::create_dir_all(dir.path().join("pwmchip0")).unwrap();
        fs::write(dir.path().join("i2c-1"), "").unwrap();
        fs::write(dir.path().join("spidev0.0"), "").unwrap();
        fs::write(dir.path().join("ttyS0"), "").unwrap();

        let report = tester.short_test();
        assert_eq!(report.result, TestResult::Success);
        assert_eq!(report.peripheral_name, "GPIO");
        assert!(report.details.contains("Digital I/O: PASS"));
        assert!(report.details.contains("UART: PASS"));
    }

    #[test]
    fn test_short_test_missing_interfaces_fail_aggregate() {
        let (_dir, tester) = fixture();
        for pin in [2, 3, 4, PWM_TEST_PIN] {
            provision_pin(&tester, pin);
        }
        // No PWM controller and no bus device nodes: every presence probe is
        // NOT SUPPORTED, which fails the GPIO aggregate.

        let report = tester.short_test();
        assert_eq!(report.result, TestResult::Failure);
        assert!(report.details.contains("I2C: NOT SUPPORTED"));
    }

    #[test]
    fn test_unavailable_tester_reports_not_supported() {
        let dir = TempDir::new().unwrap();
        let tester = GpioTester::with_layout(
            dir.path().join("missing_gpio_root"),
            dir.path().join("pwmchip0"),
            vec![],
            vec![],
            vec![],
        );

        assert!(!tester.is_available());

        let report = tester.short_test();
        assert_eq!(report.result, TestResult::NotSupported);

        let report = tester.monitor_test(Duration::from_secs(1));
        assert_eq!(report.result, TestResult::NotSupported);
    }
}
