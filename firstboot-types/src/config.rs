// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::Storage;
use crate::units::{NetworkdUnit, SystemdUnit};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("failed to parse config {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// The full provisioning snapshot handed to the storage stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: Storage,
    pub systemd: Systemd,
    pub networkd: Networkd,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Systemd {
    pub units: Vec<SystemdUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Networkd {
    pub units: Vec<NetworkdUnit>,
}

impl Config {
    /// Load a config file. `.toml` files are parsed as TOML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let is_toml = path.extension().and_then(|value| value.to_str()) == Some("toml");
        let parsed = if is_toml {
            Self::from_toml_str(&raw)
        } else {
            Self::from_json_str(&raw)
        };

        parsed.map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|error| error.to_string())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|error| error.to_string())
    }

    /// True when the config asks for nothing at all.
    pub fn is_empty(&self) -> bool {
        self.storage.disks.is_empty()
            && self.storage.raid.is_empty()
            && self.storage.filesystems.is_empty()
            && self.systemd.units.is_empty()
            && self.networkd.units.is_empty()
    }

    /// Structural checks the storage stage relies on.
    ///
    /// The stage itself assumes a validated snapshot; callers that load
    /// configs from untrusted sources run this first.
    pub fn check(&self) -> Result<(), ConfigError> {
        for disk in &self.storage.disks {
            if disk.device.is_empty() {
                return Err(ConfigError::Invalid("disk device must not be empty".to_string()));
            }

            let mut numbers = HashSet::new();
            for partition in &disk.partitions {
                if !numbers.insert(partition.number) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate partition number {} on {}",
                        partition.number, disk.device
                    )));
                }
            }
        }

        for array in &self.storage.raid {
            if array.active_devices() < 1 {
                return Err(ConfigError::Invalid(format!(
                    "array {} needs at least one active device ({} members, {} spares)",
                    array.name,
                    array.devices.len(),
                    array.spares
                )));
            }
        }

        for filesystem in &self.storage.filesystems {
            if filesystem.device.is_empty() {
                return Err(ConfigError::Invalid(
                    "filesystem device must not be empty".to_string(),
                ));
            }
        }

        for unit in &self.systemd.units {
            if unit.name.is_empty() {
                return Err(ConfigError::Invalid("systemd unit name must not be empty".to_string()));
            }
        }

        for unit in &self.networkd.units {
            if unit.name.is_empty() {
                return Err(ConfigError::Invalid(
                    "networkd unit name must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
