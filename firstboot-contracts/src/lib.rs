// SPDX-License-Identifier: GPL-3.0-only

//! Contracts between the storage stage and the host it provisions
//!
//! Every effect the storage stage has on the machine goes through one of
//! these traits, so the stage can be driven against recording fakes.

pub mod error;
pub mod traits;

pub use error::{ProvisionError, ProvisionErrorKind, Result};
pub use traits::{
    CommandOutcome, CommandRunner, DeviceWaiter, FileWriter, Mounter, PartitionSpec,
    PartitionTable, PartitionTableOp, render_command,
};
