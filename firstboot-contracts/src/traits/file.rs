// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use crate::ProvisionError;

pub trait FileWriter: Send + Sync {
    /// Write `contents` to the absolute host path `path`, creating parent
    /// directories, then apply `mode` and `uid`/`gid` ownership.
    fn write_file(
        &self,
        path: &Path,
        contents: &[u8],
        mode: u32,
        uid: u32,
        gid: u32,
    ) -> Result<(), ProvisionError>;
}
