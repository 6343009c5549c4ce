// SPDX-License-Identifier: GPL-3.0-only

use std::fs::{self, DirBuilder, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use firstboot_contracts::{FileWriter, ProvisionError};
use nix::unistd::{Gid, Uid, chown};

const DIRECTORY_MODE: u32 = 0o755;

/// A destination root that absolute config paths are re-rooted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestDir {
    root: PathBuf,
}

impl DestDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join `path` under the root. Leading `/` and `..` never climb out of it.
    pub fn join(&self, path: impl AsRef<Path>) -> PathBuf {
        let mut relative = PathBuf::new();
        for component in path.as_ref().components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::ParentDir => {
                    relative.pop();
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        self.root.join(relative)
    }
}

pub fn create_parent_dirs(path: &Path) -> Result<(), ProvisionError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    DirBuilder::new()
        .recursive(true)
        .mode(DIRECTORY_MODE)
        .create(parent)
        .map_err(|error| ProvisionError::io(parent, error))
}

/// Writes files on the host filesystem, replacing them atomically.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFileWriter;

impl HostFileWriter {
    fn staging_path(path: &Path) -> Result<PathBuf, ProvisionError> {
        let name = path.file_name().ok_or_else(|| {
            ProvisionError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;
        let mut staged = std::ffi::OsString::from(".");
        staged.push(name);
        staged.push(format!(".firstboot-{}", std::process::id()));
        Ok(path.with_file_name(staged))
    }

    fn stage(staged: &Path, contents: &[u8], mode: u32, uid: u32, gid: u32) -> io::Result<()> {
        fs::write(staged, contents)?;
        // chown clears setuid/setgid, so ownership goes first.
        chown(staged, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))?;
        fs::set_permissions(staged, Permissions::from_mode(mode))?;
        Ok(())
    }
}

impl FileWriter for HostFileWriter {
    fn write_file(
        &self,
        path: &Path,
        contents: &[u8],
        mode: u32,
        uid: u32,
        gid: u32,
    ) -> Result<(), ProvisionError> {
        create_parent_dirs(path)?;
        let staged = Self::staging_path(path)?;

        if let Err(error) = Self::stage(&staged, contents, mode, uid, gid) {
            let _ = fs::remove_file(&staged);
            return Err(ProvisionError::io(path, error));
        }

        fs::rename(&staged, path).map_err(|error| {
            let _ = fs::remove_file(&staged);
            ProvisionError::io(path, error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firstboot_contracts::ProvisionErrorKind;
    use nix::unistd::{getgid, getuid};

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "firstboot-files-{}",
            uuid::Uuid::new_v4().simple()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn join_reroots_absolute_paths() {
        let dest = DestDir::new("/sysroot");
        assert_eq!(dest.join("/etc/hostname"), PathBuf::from("/sysroot/etc/hostname"));
        assert_eq!(dest.join("etc/hostname"), PathBuf::from("/sysroot/etc/hostname"));
    }

    #[test]
    fn join_never_escapes_root() {
        let dest = DestDir::new("/sysroot");
        assert_eq!(dest.join("/../../etc/shadow"), PathBuf::from("/sysroot/etc/shadow"));
        assert_eq!(dest.join("/etc/../../x"), PathBuf::from("/sysroot/x"));
    }

    #[test]
    fn writes_file_with_parents_and_mode() {
        let dir = scratch_dir();
        let path = DestDir::new(&dir).join("/etc/hostname");

        HostFileWriter
            .write_file(&path, b"node1", 0o644, getuid().as_raw(), getgid().as_raw())
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "node1");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o644);
        let parent_mode = fs::metadata(dir.join("etc")).unwrap().permissions().mode() & 0o777;
        assert_eq!(parent_mode & DIRECTORY_MODE, parent_mode);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn setuid_and_setgid_bits_survive_ownership_change() {
        let dir = scratch_dir();
        let uid = getuid().as_raw();
        let gid = getgid().as_raw();

        for mode in [0o4755, 0o2755] {
            let path = DestDir::new(&dir).join(format!("/usr/bin/tool-{mode:o}"));
            HostFileWriter
                .write_file(&path, b"#!/bin/sh\n", mode, uid, gid)
                .unwrap();

            let written = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
            assert_eq!(written, mode, "mode {mode:o} came back as {written:o}");
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rewriting_replaces_contents_exactly() {
        let dir = scratch_dir();
        let path = dir.join("unit.service");
        let uid = getuid().as_raw();
        let gid = getgid().as_raw();

        HostFileWriter
            .write_file(&path, b"a much longer first version", 0o600, uid, gid)
            .unwrap();
        HostFileWriter
            .write_file(&path, b"short", 0o644, uid, gid)
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"short");
        let leftovers: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        assert_eq!(leftovers.len(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unwritable_parent_is_io_error() {
        let dir = scratch_dir();
        let blocker = dir.join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let error = HostFileWriter
            .write_file(&blocker.join("file"), b"x", 0o644, 0, 0)
            .unwrap_err();
        assert_eq!(error.kind(), ProvisionErrorKind::Io);

        fs::remove_dir_all(&dir).unwrap();
    }
}
