use serde::{Serialize, Deserialize};
use std::time::Duration;
use std::path::{Path, PathBuf};


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {

    pub monitor_duration: Duration,
    pub output_format: OutputFormat,
    pub output_file: Option<PathBuf>,
    pub verbose: bool,
    pub quiet: bool,


    pub cpu_enabled: bool,
    pub gpio_enabled: bool,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            monitor_duration: Duration::from_secs(60),
            output_format: OutputFormat::Text,
            output_file: None,
            verbose: false,
            quiet: false,

            cpu_enabled: true,
            gpio_enabled: true,
        }
    }
}

impl RunConfig {

    pub fn parse_duration(duration_str: &str) -> Result<Duration, String> {
        let duration = humantime::parse_duration(duration_str)
            .map_err(|e| format!("Invalid duration format: {}", e))?;

        if duration < Duration::from_secs(1) {
            return Err("Duration must be at least 1 second".to_string());
        }
        if duration > Duration::from_secs(24 * 60 * 60) {
            return Err("Duration cannot exceed 24 hours".to_string());
        }

        Ok(duration)
    }


    pub fn from_file(path: &Path) -> Result<Self, String> {
        use std::fs;
        use std::io::Read;

        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }

        let mut file = fs::File::open(path)
            .map_err(|e| format!("Failed to open config file: {}", e))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config = if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
            toml::from_str::<Self>(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?
        } else {
            serde_json::from_str::<Self>(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?
        };

        Ok(config)
    }
}
