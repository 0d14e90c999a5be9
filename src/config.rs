//! Configuration management for gbcore
//!
//! Handles loading and saving of the runner configuration: log verbosity,
//! instruction tracing, run length and serial output handling.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log level filter: "error", "warn", "info", "debug" or "trace"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log every executed instruction
    #[serde(default)]
    pub trace: bool,

    /// Stop after this many clock cycles (0 = run until a fatal error)
    #[serde(default)]
    pub max_cycles: u64,

    /// Echo bytes sent over the serial port to stdout
    #[serde(default = "default_serial_to_stdout")]
    pub serial_to_stdout: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_serial_to_stdout() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            trace: false,
            max_cycles: 0,
            serial_to_stdout: default_serial_to_stdout(),
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("gbcore");
            fs::create_dir_all(&app_dir).ok();
            app_dir.join("config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file, falling back to defaults if it is
    /// missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => {
                        log::info!("Loaded configuration from: {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        log::error!("Failed to parse config file: {}", e);
                    }
                },
                Err(e) => {
                    log::error!("Failed to read config file: {}", e);
                }
            }
        }

        log::info!("Using default configuration");
        Self::default()
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        log::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::config_path())
    }

    /// Level filter for the logger. Tracing forces `trace`.
    pub fn level_filter(&self) -> log::LevelFilter {
        if self.trace {
            return log::LevelFilter::Trace;
        }
        self.log_level.parse().unwrap_or_else(|_| {
            log::warn!("Unknown log level \"{}\", using info", self.log_level);
            log::LevelFilter::Info
        })
    }
}
