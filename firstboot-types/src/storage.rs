// SPDX-License-Identifier: GPL-3.0-only

//! Disk, RAID and filesystem descriptions

use serde::{Deserialize, Serialize};

/// Permission mode applied to files that do not declare one.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// The `storage` section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Storage {
    pub disks: Vec<Disk>,
    #[serde(alias = "arrays")]
    pub raid: Vec<Array>,
    pub filesystems: Vec<Filesystem>,
}

impl Storage {
    /// Disks the partitioning phase will open, in configuration order.
    /// Disks with nothing to do are left out.
    pub fn disk_devices(&self) -> Vec<String> {
        self.disks
            .iter()
            .filter(|disk| !disk.is_noop())
            .map(|disk| disk.device.clone())
            .collect()
    }

    /// Member devices of every array, in configuration order.
    pub fn array_member_devices(&self) -> Vec<String> {
        self.raid
            .iter()
            .flat_map(|array| array.devices.iter().cloned())
            .collect()
    }

    /// Devices touched by the filesystem phase, in configuration order.
    pub fn filesystem_devices(&self) -> Vec<String> {
        self.filesystems
            .iter()
            .map(|filesystem| filesystem.device.clone())
            .collect()
    }
}

/// A block device to partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Disk {
    pub device: String,
    pub wipe_table: bool,
    pub partitions: Vec<Partition>,
}

impl Disk {
    /// A disk without partitions or a wipe request is never opened.
    pub fn is_noop(&self) -> bool {
        !self.wipe_table && self.partitions.is_empty()
    }
}

/// A GPT partition entry.
///
/// `size` and `start` are in sectors; zero means "rest of the disk" and
/// "next free sector" respectively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Partition {
    pub number: u32,
    pub size: u64,
    pub start: u64,
    pub label: String,
    #[serde(alias = "typeGUID")]
    pub type_guid: String,
}

/// A software RAID array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Array {
    pub name: String,
    pub level: String,
    pub devices: Vec<String>,
    pub spares: u32,
}

impl Array {
    /// Number of members that take part in the array rather than stand by.
    pub fn active_devices(&self) -> usize {
        self.devices.len().saturating_sub(self.spares as usize)
    }
}

/// A filesystem to (optionally) create and populate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Filesystem {
    pub device: String,
    pub format: String,
    pub options: Vec<String>,
    /// Format the device. When false an existing filesystem is populated as-is.
    pub initialize: bool,
    pub files: Vec<File>,
}

/// A file written inside a filesystem, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct File {
    pub path: String,
    pub contents: String,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl Default for File {
    fn default() -> Self {
        Self {
            path: String::new(),
            contents: String::new(),
            mode: DEFAULT_FILE_MODE,
            uid: 0,
            gid: 0,
        }
    }
}
