// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::{Path, PathBuf};

use firstboot_contracts::{Mounter, ProvisionError};
use uuid::Uuid;

use crate::logging::OpLogger;

/// A filesystem mounted on a private temporary directory.
///
/// Dropping the guard unmounts the filesystem (if anything is attached) and
/// removes the directory. Failures during that cleanup are logged only.
pub struct ScopedMount<'a> {
    mounter: &'a dyn Mounter,
    logger: &'a OpLogger,
    path: PathBuf,
    mounted: bool,
}

impl<'a> ScopedMount<'a> {
    pub fn acquire(
        mounter: &'a dyn Mounter,
        logger: &'a OpLogger,
        parent: &Path,
        device: &str,
        fstype: &str,
    ) -> Result<Self, ProvisionError> {
        let path = parent.join(format!("firstboot-files-{}", Uuid::new_v4().simple()));
        fs::create_dir_all(&path).map_err(|error| ProvisionError::io(&path, error))?;

        let mut scoped = Self {
            mounter,
            logger,
            path,
            mounted: false,
        };

        let result = logger.log_op_sync(
            format_args!("mounting {device:?} at {:?}", scoped.path),
            || mounter.mount(device, &scoped.path, fstype),
        );
        match result {
            Ok(()) => {
                scoped.mounted = true;
                Ok(scoped)
            }
            Err(error) => {
                scoped.mounted = mounter.is_mounted(&scoped.path);
                Err(error)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unmount and remove the mount point now instead of at the end of the scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ScopedMount<'_> {
    fn drop(&mut self) {
        if self.mounted {
            let _ = self
                .logger
                .log_op_sync(format_args!("unmounting {:?}", self.path), || {
                    self.mounter.unmount(&self.path)
                });
        }

        if let Err(error) = fs::remove_dir(&self.path) {
            self.logger.warning(format_args!(
                "failed to remove mount point {:?}: {error}",
                self.path
            ));
        }
    }
}
