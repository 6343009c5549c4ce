// SPDX-License-Identifier: GPL-3.0-only

//! Supported filesystem formatters

use std::fmt;
use std::str::FromStr;

use firstboot_contracts::ProvisionError;

/// A filesystem type the storage stage knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilesystemFormat {
    Btrfs,
    Ext4,
    Xfs,
    Vfat,
}

impl FilesystemFormat {
    pub const ALL: [FilesystemFormat; 4] = [Self::Btrfs, Self::Ext4, Self::Xfs, Self::Vfat];

    pub fn name(self) -> &'static str {
        match self {
            Self::Btrfs => "btrfs",
            Self::Ext4 => "ext4",
            Self::Xfs => "xfs",
            Self::Vfat => "vfat",
        }
    }

    pub fn mkfs_binary(self) -> &'static str {
        match self {
            Self::Btrfs => "mkfs.btrfs",
            Self::Ext4 => "mkfs.ext4",
            Self::Xfs => "mkfs.xfs",
            Self::Vfat => "mkfs.vfat",
        }
    }

    /// The formatter's non-interactive "overwrite whatever is there" switch.
    pub fn force_flag(self) -> &'static str {
        match self {
            Self::Btrfs => "--force",
            Self::Ext4 => "-F",
            Self::Xfs => "-f",
            Self::Vfat => "-I",
        }
    }

    /// `options ++ [force flag] ++ [device]`
    pub fn mkfs_args(self, options: &[String], device: &str) -> Vec<String> {
        let mut args = options.to_vec();
        args.push(self.force_flag().to_string());
        args.push(device.to_string());
        args
    }
}

impl FromStr for FilesystemFormat {
    type Err = ProvisionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.name() == value)
            .ok_or_else(|| ProvisionError::UnsupportedFormat(value.to_string()))
    }
}

impl fmt::Display for FilesystemFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
