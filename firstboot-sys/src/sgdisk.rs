// SPDX-License-Identifier: GPL-3.0-only

//! GPT partitioning through sgdisk

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use firstboot_contracts::{
    CommandRunner, PartitionSpec, PartitionTable, PartitionTableOp, ProvisionError,
};

/// [`PartitionTable`] backed by the sgdisk binary.
#[derive(Clone)]
pub struct Sgdisk {
    binary: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Sgdisk {
    pub fn new(binary: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }
}

impl PartitionTable for Sgdisk {
    fn begin(&self, device: &str) -> Box<dyn PartitionTableOp> {
        Box::new(SgdiskOperation {
            binary: self.binary.clone(),
            runner: Arc::clone(&self.runner),
            device: device.to_string(),
            wipe: false,
            partitions: Vec::new(),
        })
    }
}

/// Changes queued against one disk.
pub struct SgdiskOperation {
    binary: PathBuf,
    runner: Arc<dyn CommandRunner>,
    device: String,
    wipe: bool,
    partitions: Vec<PartitionSpec>,
}

pub fn wipe_args(device: &str) -> Vec<String> {
    vec!["--zap-all".to_string(), device.to_string()]
}

/// One sgdisk invocation creating every partition, in order.
pub fn partition_args(device: &str, partitions: &[PartitionSpec]) -> Vec<String> {
    let mut args = Vec::new();
    for partition in partitions {
        args.push(format!(
            "--new={}:{}:+{}",
            partition.number, partition.offset, partition.length
        ));
        if !partition.label.is_empty() {
            args.push(format!(
                "--change-name={}:{}",
                partition.number, partition.label
            ));
        }
        if !partition.type_guid.is_empty() {
            args.push(format!(
                "--typecode={}:{}",
                partition.number, partition.type_guid
            ));
        }
    }
    args.push(device.to_string());
    args
}

impl SgdiskOperation {
    async fn run(&self, args: Vec<String>) -> Result<(), ProvisionError> {
        self.runner
            .run(&self.binary, &args)
            .await
            .map(|_| ())
            .map_err(|error| ProvisionError::Commit {
                device: self.device.clone(),
                reason: error.to_string(),
            })
    }
}

#[async_trait]
impl PartitionTableOp for SgdiskOperation {
    fn device(&self) -> &str {
        &self.device
    }

    fn wipe_table(&mut self, wipe: bool) {
        self.wipe = wipe;
    }

    fn create_partition(&mut self, partition: PartitionSpec) {
        self.partitions.push(partition);
    }

    async fn commit(&mut self) -> Result<(), ProvisionError> {
        if self.wipe {
            tracing::info!(device = %self.device, "wiping partition table");
            self.run(wipe_args(&self.device)).await?;
        }

        if !self.partitions.is_empty() {
            tracing::info!(
                device = %self.device,
                count = self.partitions.len(),
                "writing partitions"
            );
            self.run(partition_args(&self.device, &self.partitions))
                .await?;
        }

        Ok(())
    }
}
