// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use crate::ProvisionError;

pub trait Mounter: Send + Sync {
    fn mount(&self, device: &str, target: &Path, fstype: &str) -> Result<(), ProvisionError>;

    fn unmount(&self, target: &Path) -> Result<(), ProvisionError>;

    /// Whether something is currently mounted at `target`.
    fn is_mounted(&self, target: &Path) -> bool;
}
