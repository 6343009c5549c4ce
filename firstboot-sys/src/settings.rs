// SPDX-License-Identifier: GPL-3.0-only

//! Agent settings: where the target root lives, how long to wait for devices
//! and where the external tools are installed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use firstboot_contracts::ProvisionError;
use serde::{Deserialize, Serialize};
use which::which;

pub const DEFAULT_ROOT: &str = "/sysroot";
pub const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_DEVICE_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Root filesystem of the system being provisioned.
    pub root: PathBuf,
    pub device_timeout_secs: u64,
    pub device_poll_interval_ms: u64,
    /// Parent directory for the temporary mount points used to populate files.
    pub mount_parent: Option<PathBuf>,
    pub tools: ToolPaths,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            device_timeout_secs: DEFAULT_DEVICE_TIMEOUT_SECS,
            device_poll_interval_ms: DEFAULT_DEVICE_POLL_INTERVAL_MS,
            mount_parent: None,
            tools: ToolPaths::default(),
        }
    }
}

impl AgentSettings {
    pub fn load(path: &Path) -> Result<Self, ProvisionError> {
        let raw = fs::read_to_string(path).map_err(|error| ProvisionError::io(path, error))?;
        toml::from_str(&raw).map_err(|error| {
            ProvisionError::Config(format!("settings {}: {error}", path.display()))
        })
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.device_timeout_secs)
    }

    pub fn device_poll_interval(&self) -> Duration {
        Duration::from_millis(self.device_poll_interval_ms.max(1))
    }

    pub fn mount_parent(&self) -> PathBuf {
        self.mount_parent.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub sgdisk: PathBuf,
    pub mdadm: PathBuf,
    /// Directory holding the `mkfs.<format>` binaries.
    pub mkfs_dir: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            sgdisk: PathBuf::from("/sbin/sgdisk"),
            mdadm: PathBuf::from("/sbin/mdadm"),
            mkfs_dir: PathBuf::from("/sbin"),
        }
    }
}

impl ToolPaths {
    pub fn sgdisk(&self) -> PathBuf {
        resolve_tool(&self.sgdisk)
    }

    pub fn mdadm(&self) -> PathBuf {
        resolve_tool(&self.mdadm)
    }

    pub fn mkfs(&self, binary_name: &str) -> PathBuf {
        resolve_tool(&self.mkfs_dir.join(binary_name))
    }
}

/// Use the configured path when it exists, otherwise look the binary up on
/// `PATH`. Falls back to the configured path so the spawn error names it.
pub fn resolve_tool(configured: &Path) -> PathBuf {
    if configured.exists() {
        return configured.to_path_buf();
    }

    configured
        .file_name()
        .and_then(|name| which(name).ok())
        .unwrap_or_else(|| configured.to_path_buf())
}
