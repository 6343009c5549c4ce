// SPDX-License-Identifier: GPL-3.0-only

//! Unit phase: systemd and networkd units written onto the target root

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, symlink};
use std::path::{Path, PathBuf};

use firstboot_contracts::{FileWriter, ProvisionError};
use firstboot_sys::DestDir;
use firstboot_sys::files::create_parent_dirs;
use firstboot_types::{Config, DropIn, NetworkdUnit, SystemdUnit};

use crate::logging::OpLogger;

pub const SYSTEMD_UNITS_DIR: &str = "/etc/systemd/system";
pub const NETWORKD_UNITS_DIR: &str = "/etc/systemd/network";
pub const PRESET_PATH: &str = "/etc/systemd/system-preset/20-ignition.preset";

const UNIT_FILE_MODE: u32 = 0o644;
const PRESET_FILE_MODE: u32 = 0o644;
const NULL_DEVICE: &str = "/dev/null";

pub fn systemd_unit_path(name: &str) -> PathBuf {
    Path::new(SYSTEMD_UNITS_DIR).join(name)
}

pub fn dropin_path(unit: &str, dropin: &str) -> PathBuf {
    Path::new(SYSTEMD_UNITS_DIR)
        .join(format!("{unit}.d"))
        .join(dropin)
}

pub fn networkd_unit_path(name: &str) -> PathBuf {
    Path::new(NETWORKD_UNITS_DIR).join(name)
}

pub struct UnitWriter<'a> {
    logger: &'a OpLogger,
    writer: &'a dyn FileWriter,
    root: &'a DestDir,
}

impl<'a> UnitWriter<'a> {
    pub fn new(logger: &'a OpLogger, writer: &'a dyn FileWriter, root: &'a DestDir) -> Self {
        Self {
            logger,
            writer,
            root,
        }
    }

    pub fn create_units(&self, config: &Config) -> Result<(), ProvisionError> {
        if config.systemd.units.is_empty() && config.networkd.units.is_empty() {
            return Ok(());
        }
        let _prefix = self.logger.push_prefix("createUnits");

        for unit in &config.systemd.units {
            self.write_systemd_unit(unit)?;

            if unit.enable {
                self.logger
                    .log_op_sync(format_args!("enabling unit {:?}", unit.name), || {
                        self.enable_unit(unit)
                    })?;
            }
            if unit.mask {
                self.logger
                    .log_op_sync(format_args!("masking unit {:?}", unit.name), || {
                        self.mask_unit(unit)
                    })?;
            }
        }

        for unit in &config.networkd.units {
            self.write_networkd_unit(unit)?;
        }

        Ok(())
    }

    fn write_unit_file(&self, relative: &Path, contents: &str) -> Result<(), ProvisionError> {
        let path = self.root.join(relative);
        self.writer
            .write_file(&path, contents.as_bytes(), UNIT_FILE_MODE, 0, 0)
    }

    /// Write the non-empty drop-ins, then the unit itself if it has contents.
    pub fn write_systemd_unit(&self, unit: &SystemdUnit) -> Result<(), ProvisionError> {
        self.logger
            .log_op_sync(format_args!("writing unit {:?}", unit.name), || {
                for dropin in unit.dropins.iter().filter(|dropin| !dropin.contents.is_empty()) {
                    self.write_dropin(unit, dropin)?;
                }

                if unit.contents.is_empty() {
                    return Ok(());
                }

                let relative = systemd_unit_path(&unit.name);
                self.logger.log_op_sync(
                    format_args!("writing unit {:?} at {:?}", unit.name, relative),
                    || self.write_unit_file(&relative, &unit.contents),
                )
            })
            .map_err(|error| error.with_context(format!("unit {:?}", unit.name)))
    }

    fn write_dropin(&self, unit: &SystemdUnit, dropin: &DropIn) -> Result<(), ProvisionError> {
        let relative = dropin_path(&unit.name, &dropin.name);
        self.logger.log_op_sync(
            format_args!("writing dropin {:?} at {:?}", dropin.name, relative),
            || self.write_unit_file(&relative, &dropin.contents),
        )
    }

    pub fn write_networkd_unit(&self, unit: &NetworkdUnit) -> Result<(), ProvisionError> {
        if unit.contents.is_empty() {
            return Ok(());
        }

        let relative = networkd_unit_path(&unit.name);
        self.logger
            .log_op_sync(
                format_args!("writing unit {:?} at {:?}", unit.name, relative),
                || self.write_unit_file(&relative, &unit.contents),
            )
            .map_err(|error| error.with_context(format!("networkd unit {:?}", unit.name)))
    }

    /// Append `enable <name>` to the preset file unless it is already listed,
    /// so a rerun leaves the preset file unchanged.
    pub fn enable_unit(&self, unit: &SystemdUnit) -> Result<(), ProvisionError> {
        let path = self.root.join(PRESET_PATH);
        let directive = format!("enable {}", unit.name);

        let existing = match fs::read_to_string(&path) {
            Ok(existing) => existing,
            Err(error) if error.kind() == io::ErrorKind::NotFound => String::new(),
            Err(error) => return Err(ProvisionError::io(&path, error)),
        };
        if existing.lines().any(|entry| entry == directive) {
            return Ok(());
        }

        let mut line = String::new();
        if !existing.is_empty() && !existing.ends_with('\n') {
            line.push('\n');
        }
        line.push_str(&directive);
        line.push('\n');

        create_parent_dirs(&path)?;
        let mut preset = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(PRESET_FILE_MODE)
            .open(&path)
            .map_err(|error| ProvisionError::io(&path, error))?;
        preset
            .write_all(line.as_bytes())
            .map_err(|error| ProvisionError::io(&path, error))
    }

    /// Link the unit's path to the null device. An existing link to the null
    /// device is accepted; any other entry at that path is an error.
    pub fn mask_unit(&self, unit: &SystemdUnit) -> Result<(), ProvisionError> {
        let path = self.root.join(systemd_unit_path(&unit.name));

        match fs::symlink_metadata(&path) {
            Ok(metadata) => {
                let masked = metadata.file_type().is_symlink()
                    && fs::read_link(&path).is_ok_and(|target| target == Path::new(NULL_DEVICE));
                if masked {
                    return Ok(());
                }
                return Err(ProvisionError::io(
                    &path,
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "unit path already exists and is not a mask",
                    ),
                ));
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                create_parent_dirs(&path)?;
            }
            Err(error) => return Err(ProvisionError::io(&path, error)),
        }

        symlink(NULL_DEVICE, &path).map_err(|error| ProvisionError::io(&path, error))
    }
}
