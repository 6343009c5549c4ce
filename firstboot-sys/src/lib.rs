// SPDX-License-Identifier: GPL-3.0-only

//! Low-level host operations for the firstboot storage stage
//!
//! This crate provides the real implementations of the storage stage's
//! host contracts:
//! - Child process execution for mdadm, mkfs.* and sgdisk
//! - GPT partitioning through sgdisk
//! - Device node polling
//! - mount(2)/umount(2)
//! - File writes relative to a destination root
//!
//! These operations require root privileges on the machine being provisioned.

pub mod cmd;
pub mod devices;
pub mod files;
pub mod mount;
pub mod settings;
pub mod sgdisk;

pub use cmd::HostCommandRunner;
pub use devices::PollingDeviceWaiter;
pub use files::{DestDir, HostFileWriter};
pub use mount::{NixMounter, is_mount_point};
pub use settings::{AgentSettings, ToolPaths};
pub use sgdisk::Sgdisk;
