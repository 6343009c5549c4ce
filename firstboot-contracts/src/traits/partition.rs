// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ProvisionError;

/// A partition queued on a [`PartitionTableOp`].
///
/// `length` and `offset` are in sectors; zero selects the partitioner's
/// default (rest of the free space and next free sector).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub number: u32,
    pub length: u64,
    pub offset: u64,
    pub label: String,
    pub type_guid: String,
}

pub trait PartitionTable: Send + Sync {
    /// Start a table edit on `device`. Nothing touches the disk before commit.
    fn begin(&self, device: &str) -> Box<dyn PartitionTableOp>;
}

#[async_trait]
pub trait PartitionTableOp: Send {
    fn device(&self) -> &str;

    fn wipe_table(&mut self, wipe: bool);

    fn create_partition(&mut self, partition: PartitionSpec);

    /// Write every queued change to the disk as one table update.
    async fn commit(&mut self) -> Result<(), ProvisionError>;
}
