// SPDX-License-Identifier: GPL-3.0-only

pub mod command;
pub mod device;
pub mod file;
pub mod mount;
pub mod partition;

pub use command::{CommandOutcome, CommandRunner, render_command};
pub use device::DeviceWaiter;
pub use file::FileWriter;
pub use mount::Mounter;
pub use partition::{PartitionSpec, PartitionTable, PartitionTableOp};
