// SPDX-License-Identifier: GPL-3.0-only

//! Software RAID assembly through mdadm

use std::path::PathBuf;

use firstboot_contracts::{CommandRunner, DeviceWaiter, ProvisionError};
use firstboot_types::{Array, Storage};

use crate::devices::wait_on_devices;
use crate::logging::OpLogger;

/// `mdadm` arguments that create, force and start `array` in one step.
///
/// Members that still carry a superblock from an earlier array are passed
/// as-is; their metadata is not zeroed first.
pub fn mdadm_create_args(array: &Array) -> Vec<String> {
    let mut args = vec![
        "--create".to_string(),
        array.name.clone(),
        "--force".to_string(),
        "--run".to_string(),
        "--level".to_string(),
        array.level.clone(),
        "--raid-devices".to_string(),
        array.active_devices().to_string(),
    ];

    if array.spares > 0 {
        args.push("--spare-devices".to_string());
        args.push(array.spares.to_string());
    }

    args.extend(array.devices.iter().cloned());
    args
}

pub struct RaidAssembler<'a> {
    logger: &'a OpLogger,
    waiter: &'a dyn DeviceWaiter,
    runner: &'a dyn CommandRunner,
    mdadm: PathBuf,
}

impl<'a> RaidAssembler<'a> {
    pub fn new(
        logger: &'a OpLogger,
        waiter: &'a dyn DeviceWaiter,
        runner: &'a dyn CommandRunner,
        mdadm: PathBuf,
    ) -> Self {
        Self {
            logger,
            waiter,
            runner,
            mdadm,
        }
    }

    pub async fn create_raids(&self, storage: &Storage) -> Result<(), ProvisionError> {
        if storage.raid.is_empty() {
            return Ok(());
        }
        let _prefix = self.logger.push_prefix("createRaids");

        wait_on_devices(
            self.logger,
            self.waiter,
            &storage.array_member_devices(),
            "raids",
        )
        .await?;

        for array in &storage.raid {
            self.logger
                .log_cmd(
                    self.runner,
                    &self.mdadm,
                    &mdadm_create_args(array),
                    format!("creating {:?}", array.name),
                )
                .await
                .map_err(|error| {
                    error
                        .with_context("mdadm failed")
                        .with_context(format!("array {:?}", array.name))
                })?;
        }

        Ok(())
    }
}
