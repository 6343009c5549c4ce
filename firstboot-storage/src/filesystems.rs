// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem phase: optional formatting, then file population through a
//! scoped mount.

use std::path::Path;

use firstboot_contracts::{CommandRunner, DeviceWaiter, FileWriter, Mounter, ProvisionError};
use firstboot_sys::{DestDir, ToolPaths};
use firstboot_types::{Filesystem, Storage};

use crate::devices::wait_on_devices;
use crate::format::FilesystemFormat;
use crate::logging::OpLogger;
use crate::scoped_mount::ScopedMount;

pub struct FilesystemBuilder<'a> {
    pub logger: &'a OpLogger,
    pub waiter: &'a dyn DeviceWaiter,
    pub runner: &'a dyn CommandRunner,
    pub mounter: &'a dyn Mounter,
    pub writer: &'a dyn FileWriter,
    pub tools: &'a ToolPaths,
    pub mount_parent: &'a Path,
}

impl FilesystemBuilder<'_> {
    pub async fn create_filesystems(&self, storage: &Storage) -> Result<(), ProvisionError> {
        if storage.filesystems.is_empty() {
            return Ok(());
        }
        let _prefix = self.logger.push_prefix("createFilesystems");

        wait_on_devices(
            self.logger,
            self.waiter,
            &storage.filesystem_devices(),
            "filesystems",
        )
        .await?;

        for filesystem in &storage.filesystems {
            self.create_filesystem(filesystem).await.map_err(|error| {
                error.with_context(format!("filesystem on {:?}", filesystem.device))
            })?;
        }

        Ok(())
    }

    async fn create_filesystem(&self, filesystem: &Filesystem) -> Result<(), ProvisionError> {
        if filesystem.initialize {
            self.format(filesystem).await?;
        } else {
            self.logger.debug(format_args!(
                "keeping existing filesystem on {:?}",
                filesystem.device
            ));
        }

        self.create_files(filesystem)
    }

    async fn format(&self, filesystem: &Filesystem) -> Result<(), ProvisionError> {
        let format: FilesystemFormat = filesystem.format.parse()?;
        let program = self.tools.mkfs(format.mkfs_binary());
        let args = format.mkfs_args(&filesystem.options, &filesystem.device);

        self.logger
            .log_cmd(
                self.runner,
                &program,
                &args,
                format!(
                    "creating {:?} filesystem on {:?}",
                    format.name(),
                    filesystem.device
                ),
            )
            .await
            .map_err(|error| error.with_context(format!("mkfs.{format} failed")))?;

        Ok(())
    }

    fn create_files(&self, filesystem: &Filesystem) -> Result<(), ProvisionError> {
        if filesystem.files.is_empty() {
            return Ok(());
        }
        let _prefix = self.logger.push_prefix("createFiles");

        let mount = ScopedMount::acquire(
            self.mounter,
            self.logger,
            self.mount_parent,
            &filesystem.device,
            &filesystem.format,
        )?;
        let dest = DestDir::new(mount.path());

        for file in &filesystem.files {
            let path = dest.join(&file.path);
            self.logger
                .log_op_sync(format_args!("writing file {:?}", file.path), || {
                    self.writer.write_file(
                        &path,
                        file.contents.as_bytes(),
                        file.mode,
                        file.uid,
                        file.gid,
                    )
                })
                .map_err(|error| error.with_context(format!("file {:?}", file.path)))?;
        }

        mount.release();
        Ok(())
    }
}
