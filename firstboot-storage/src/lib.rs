// SPDX-License-Identifier: GPL-3.0-only

//! Firstboot storage stage
//!
//! Partitions disks, assembles RAID arrays, creates and populates
//! filesystems and writes systemd/networkd units onto the target root,
//! strictly in that order and stopping at the first failure.

mod devices;
pub mod filesystems;
pub mod format;
pub mod logging;
pub mod partitions;
pub mod pipeline;
pub mod raid;
pub mod scoped_mount;
pub mod stage;
pub mod units;

#[cfg(test)]
mod fakes;

pub use format::FilesystemFormat;
pub use logging::OpLogger;
pub use pipeline::{Backends, Phase, PipelineOutcome, StoragePipeline};
pub use stage::{STORAGE_STAGE, Stage, StageCreator, StageError, StageRegistry, StorageStage};
