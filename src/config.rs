//! Persistent settings for the CLI
//!
//! Read from `$XDG_CONFIG_HOME/mini-kvm/config.toml` unless another path is
//! given. Every field has a default, so a missing file or a partial file is
//! fine; a malformed one is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use ch9329_protocol::protocol::timing;
use kvm_input::ScreenGeometry;
use serde::{Deserialize, Serialize};

/// Top-level config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub screen: ScreenConfig,
    pub input: InputConfig,
}

/// `[serial]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path; auto-detected when unset
    pub port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: timing::DEFAULT_BAUD_RATE,
            read_timeout_ms: timing::RESPONSE_TIMEOUT_MS,
        }
    }
}

/// `[screen]` section: resolution of the captured video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// `[input]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Pause between typed characters
    pub type_delay_ms: u64,
    /// Send large relative moves as several reports instead of clamping
    pub split_relative: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            type_delay_ms: 10,
            split_relative: true,
        }
    }
}

impl Config {
    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mini-kvm")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply command-line overrides on top of the file values
    pub fn with_overrides(mut self, port: Option<String>, baud_rate: Option<u32>) -> Self {
        if port.is_some() {
            self.serial.port = port;
        }
        if let Some(baud) = baud_rate {
            self.serial.baud_rate = baud;
        }
        self
    }

    pub fn geometry(&self) -> ScreenGeometry {
        ScreenGeometry::new(self.screen.width, self.screen.height)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.read_timeout_ms)
    }

    pub fn type_delay(&self) -> Duration {
        Duration::from_millis(self.input.type_delay_ms)
    }
}
