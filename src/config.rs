// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::locker::LockerConfig;

/// Sample public device key, as shipped with the vendor demo. Replace with
/// your own device's key.
const DEFAULT_DEVICE_KEY: &str = "048820d633e607acbc2bc72c8b351a226a20a28ea6f9aaa288d48580c0814f8eeadb359a0e00744163ca115253c4575ac2d7b8439fe3ff2281c3ca2fffd1bd9e00";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on each awaited locker operation, in milliseconds.
    /// Unset means wait as long as the service does.
    pub operation_timeout_ms: Option<u64>,

    /// Locker service settings.
    pub locker: LockerConfig,

    /// Demo flow settings.
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Public device key for device-info validation, hex encoded.
    pub device_key: String,

    /// Credential presented to the lock.
    pub credential: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            device_key: DEFAULT_DEVICE_KEY.to_string(),
            credential: 12345,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            operation_timeout_ms: None,
            locker: LockerConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating the
    /// default file on first run.
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("locker-companion");
        Self::load_from(&config_dir)
    }

    fn load_from(config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir)?;
        let config_path = config_dir.join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content).context("invalid config file")
        } else {
            let config = Self::default();
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(&config_path, content)?;
            Ok(config)
        }
    }

    /// Save configuration to the user config directory.
    #[allow(dead_code)]
    pub fn save(&self) -> Result<()> {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("locker-companion");

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    /// The configured operation timeout, if any.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    /// Decode the demo validation key.
    pub fn device_key(&self) -> Result<Vec<u8>> {
        hex::decode(self.demo.device_key.trim()).context("device_key is not valid hex")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_first_run_writes_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();

        assert!(dir.path().join("config.toml").exists());
        assert_eq!(config.demo.credential, 12345);
        assert!(config.operation_timeout().is_none());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let mut config = Config::load_from(dir.path()).unwrap();
        config.operation_timeout_ms = Some(750);
        config.demo.credential = 98765;

        let content = toml::to_string_pretty(&config).unwrap();
        std::fs::write(dir.path().join("config.toml"), content).unwrap();

        let reloaded = Config::load_from(dir.path()).unwrap();
        assert_eq!(reloaded.operation_timeout(), Some(Duration::from_millis(750)));
        assert_eq!(reloaded.demo.credential, 98765);
    }

    #[test]
    fn test_default_device_key_decodes() {
        let config = Config::default();
        let key = config.device_key().unwrap();
        assert_eq!(key.len(), 65);
        assert_eq!(key[0], 0x04);
    }
}
