// SPDX-License-Identifier: GPL-3.0-only

//! Provisioning configuration snapshot for the firstboot storage stage
//!
//! This crate defines the already-validated description of the desired disk
//! layout and unit files. The storage stage only ever reads these types:
//!
//! - **Storage**: `Disk` → `Partition`, `Array`, `Filesystem` → `File`
//! - **Units**: `SystemdUnit` → `DropIn`, `NetworkdUnit`
//!
//! A `Config` is loaded once per run from JSON or TOML and is never mutated.

pub mod config;
pub mod storage;
pub mod units;

pub use config::{Config, ConfigError, Networkd, Systemd};
pub use storage::{Array, DEFAULT_FILE_MODE, Disk, File, Filesystem, Partition, Storage};
pub use units::{DropIn, NetworkdUnit, SystemdUnit};
