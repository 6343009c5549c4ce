// SPDX-License-Identifier: GPL-3.0-only

//! Partitioning phase: one atomic GPT update per disk

use firstboot_contracts::{DeviceWaiter, PartitionSpec, PartitionTable, ProvisionError};
use firstboot_types::{Disk, Partition, Storage};

use crate::devices::wait_on_devices;
use crate::logging::OpLogger;

pub struct PartitionTableWriter<'a> {
    logger: &'a OpLogger,
    waiter: &'a dyn DeviceWaiter,
    table: &'a dyn PartitionTable,
}

fn partition_spec(partition: &Partition) -> PartitionSpec {
    PartitionSpec {
        number: partition.number,
        length: partition.size,
        offset: partition.start,
        label: partition.label.clone(),
        type_guid: partition.type_guid.clone(),
    }
}

impl<'a> PartitionTableWriter<'a> {
    pub fn new(
        logger: &'a OpLogger,
        waiter: &'a dyn DeviceWaiter,
        table: &'a dyn PartitionTable,
    ) -> Self {
        Self {
            logger,
            waiter,
            table,
        }
    }

    /// Partition every disk in configuration order. Tables already committed
    /// for earlier disks stay in place when a later disk fails.
    pub async fn create_partitions(&self, storage: &Storage) -> Result<(), ProvisionError> {
        if storage.disks.is_empty() {
            return Ok(());
        }
        let _prefix = self.logger.push_prefix("createPartitions");

        wait_on_devices(self.logger, self.waiter, &storage.disk_devices(), "disks").await?;

        for disk in &storage.disks {
            self.partition_disk(disk).await?;
        }

        Ok(())
    }

    async fn partition_disk(&self, disk: &Disk) -> Result<(), ProvisionError> {
        if disk.is_noop() {
            self.logger
                .debug(format_args!("nothing to do on {:?}", disk.device));
            return Ok(());
        }

        self.logger
            .log_op(format!("partitioning {:?}", disk.device), async {
                let mut op = self.table.begin(&disk.device);
                if disk.wipe_table {
                    self.logger.notice(format_args!(
                        "wiping partition table requested on {:?}",
                        op.device()
                    ));
                    op.wipe_table(true);
                }

                for partition in &disk.partitions {
                    op.create_partition(partition_spec(partition));
                }

                op.commit().await
            })
            .await
            .map_err(|error| error.with_context(format!("partitioning {:?}", disk.device)))
    }
}
