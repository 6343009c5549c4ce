// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use firstboot_contracts::{Mounter, ProvisionError};
use nix::mount::{MntFlags, MsFlags, mount, umount2};

/// mount(2)/umount(2) through nix.
#[derive(Debug, Clone, Copy, Default)]
pub struct NixMounter;

impl Mounter for NixMounter {
    fn mount(&self, device: &str, target: &Path, fstype: &str) -> Result<(), ProvisionError> {
        mount(
            Some(device),
            target,
            Some(fstype),
            MsFlags::empty(),
            None::<&str>,
        )
        .map_err(|errno| ProvisionError::Mount {
            device: device.to_string(),
            target: target.to_path_buf(),
            reason: errno.to_string(),
        })
    }

    fn unmount(&self, target: &Path) -> Result<(), ProvisionError> {
        umount2(target, MntFlags::empty()).map_err(|errno| ProvisionError::Unmount {
            target: target.to_path_buf(),
            reason: errno.to_string(),
        })
    }

    fn is_mounted(&self, target: &Path) -> bool {
        is_mount_point(target)
    }
}

/// A directory is a mount point when it sits on a different device than its
/// parent, or is its own parent.
pub fn is_mount_point(path: &Path) -> bool {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return false;
    };
    let Some(parent) = path.parent() else {
        return true;
    };
    let Ok(parent_metadata) = fs::metadata(parent) else {
        return false;
    };

    metadata.dev() != parent_metadata.dev() || metadata.ino() == parent_metadata.ino()
}
