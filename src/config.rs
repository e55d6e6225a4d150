use crate::error::{Result, SubtrackError};
use crate::source::Encoding;
use crate::subtitle::Format;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Encoding name used when the command line does not give one.
    pub default_encoding: String,
    /// Forced format; `None` means detect from the file extension.
    pub default_format: Option<Format>,
    /// Polling interval for `play`, in milliseconds.
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_encoding: "utf-8".to_string(),
            default_format: None,
            tick_ms: 100,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = Self::from_toml(&contents)?;
            }
        }

        // Override with environment variables
        if let Ok(encoding) = std::env::var("SUBTRACK_ENCODING") {
            config.default_encoding = encoding;
        }
        if let Ok(format) = std::env::var("SUBTRACK_FORMAT") {
            if let Ok(f) = format.parse() {
                config.default_format = Some(f);
            }
        }
        if let Ok(tick) = std::env::var("SUBTRACK_TICK_MS") {
            if let Ok(t) = tick.parse() {
                config.tick_ms = t;
            }
        }

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| SubtrackError::Config(format!("Invalid config file: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        self.default_encoding.parse::<Encoding>()?;

        if self.tick_ms == 0 {
            return Err(SubtrackError::Config(
                "tick_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("subtrack").join("config.toml"))
    }
}
