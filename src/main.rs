use std::process;
use std::path::PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use anyhow::{Result, Context};
use log::{info, error};
use simple_logger::SimpleLogger;

use boardcheck::core::config::{RunConfig, OutputFormat as ConfigFormat};
use boardcheck::core::runner::{TestRunner, TestMode};
use boardcheck::core::report::TestResult;
use boardcheck::core::tester::PeripheralTester;
use boardcheck::testers::cpu::CpuTester;
use boardcheck::testers::gpio::GpioTester;
use boardcheck::reporters::{Reporter, text::TextReporter, json::JsonReporter, csv::CsvReporter};


#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,


    #[arg(short, long)]
    output: Option<String>,


    #[arg(short, long)]
    verbose: bool,


    #[arg(short, long)]
    quiet: bool,


    #[arg(short, long)]
    config: Option<PathBuf>,


    #[command(subcommand)]
    command: Commands,
}


#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {

    Text,

    Json,

    Csv,
}


#[derive(Subcommand)]
enum Commands {

    Short {

        #[arg(short, long, value_enum)]
        peripherals: Option<Vec<Peripheral>>,
    },


    Monitor {

        #[arg(short, long, default_value = "60s")]
        duration: String,


        #[arg(short, long, value_enum)]
        peripherals: Option<Vec<Peripheral>>,
    },


    List,


    Hardware,
}


#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Peripheral {

    Cpu,

    Gpio,
}

fn main() -> Result<()> {

    let cli = Cli::parse();


    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    SimpleLogger::new()
        .with_level(log_level)
        .init()
        .context("Failed to initialize logger")?;

    info!("Boardcheck v{}", env!("CARGO_PKG_VERSION"));


    let mut config = if let Some(path) = &cli.config {
        RunConfig::from_file(path)
            .map_err(anyhow::Error::msg)
            .context("Failed to load config file")?
    } else {
        RunConfig::default()
    };

    config.verbose = cli.verbose;
    config.quiet = cli.quiet;
    config.output_file = cli.output.clone().map(PathBuf::from);
    config.output_format = match cli.format {
        OutputFormat::Text => ConfigFormat::Text,
        OutputFormat::Json => ConfigFormat::Json,
        OutputFormat::Csv => ConfigFormat::Csv,
    };


    let mode = match &cli.command {
        Commands::Short { peripherals } => {
            select_peripherals(&mut config, peripherals);
            TestMode::Short
        }

        Commands::Monitor { duration, peripherals } => {
            config.monitor_duration = RunConfig::parse_duration(duration)
                .map_err(anyhow::Error::msg)
                .context("Failed to parse duration")?;
            select_peripherals(&mut config, peripherals);
            TestMode::Monitor
        }

        Commands::List => {
            return list_peripherals();
        }

        Commands::Hardware => {
            return print_hardware_info();
        }
    };


    let reporter: Box<dyn Reporter + Send + Sync> = match cli.format {
        OutputFormat::Text => Box::new(TextReporter::new(cli.verbose, cli.quiet)),
        OutputFormat::Json => Box::new(JsonReporter::new(cli.output.clone(), cli.verbose)),
        OutputFormat::Csv => Box::new(CsvReporter::new(cli.output.clone())),
    };


    let mut testers: Vec<Box<dyn PeripheralTester + Send + Sync>> = Vec::new();

    if config.cpu_enabled {
        testers.push(Box::new(CpuTester::new()));
    }

    if config.gpio_enabled {
        testers.push(Box::new(GpioTester::new()));
    }

    if testers.is_empty() {
        error!("No peripherals enabled. Please enable at least one peripheral to test.");
        process::exit(1);
    }


    let mut runner = TestRunner::new(testers, config, reporter);


    match runner.execute_all(mode) {
        Ok(suite) => {
            if suite.overall_result == TestResult::Failure {
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Test execution failed: {}", e);
            process::exit(2);
        }
    }

    Ok(())
}


fn select_peripherals(config: &mut RunConfig, peripherals: &Option<Vec<Peripheral>>) {
    if let Some(peripherals) = peripherals {
        config.cpu_enabled = false;
        config.gpio_enabled = false;

        for peripheral in peripherals {
            match peripheral {
                Peripheral::Cpu => config.cpu_enabled = true,
                Peripheral::Gpio => config.gpio_enabled = true,
            }
        }
    }
}


fn list_peripherals() -> Result<()> {
    println!("Available Peripherals:");
    println!("======================");

    let cpu_tester = CpuTester::new();
    println!(
        "CPU:  {}",
        if cpu_tester.is_available() { "Available" } else { "Not Available" }
    );

    let gpio_tester = GpioTester::new();
    println!(
        "GPIO: {}",
        if gpio_tester.is_available() { "Available" } else { "Not Available" }
    );

    Ok(())
}


fn print_hardware_info() -> Result<()> {
    use sysinfo::System;

    println!("System Hardware Information:");
    println!("============================");

    let mut system = System::new_all();
    system.refresh_all();

    println!("Host:");
    println!("  Hostname: {}", System::host_name().unwrap_or_else(|| "unknown".to_string()));
    println!("  OS: {} {}",
        System::name().unwrap_or_else(|| "unknown".to_string()),
        System::os_version().unwrap_or_else(|| "unknown".to_string()));
    println!("  Kernel: {}", System::kernel_version().unwrap_or_else(|| "unknown".to_string()));
    println!("  Memory: {:.2} GB", system.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0);

    let cpu_tester = CpuTester::new();
    let info = cpu_tester.info();
    println!("\nCPU:");
    println!("  Model: {}", info.model_name);
    println!("  Cores: {} ({} logical)", info.cores, num_cpus::get());
    println!("  Architecture: {}", info.architecture);
    println!("  Max Frequency: {:.0} MHz", info.frequency_mhz);
    match info.temperature_c {
        Some(temp) => println!("  Temperature: {:.1}°C", temp),
        None => println!("  Temperature: not available"),
    }

    let gpio_tester = GpioTester::new();
    println!("\nGPIO Header Layout:");
    for pin in gpio_tester.pins() {
        println!("  GPIO {:>2}: {:?}", pin.number, pin.mode);
    }

    Ok(())
}
