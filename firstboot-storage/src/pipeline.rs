// SPDX-License-Identifier: GPL-3.0-only

//! The storage pipeline
//!
//! Four phases run in a fixed order: partitions, RAID arrays, filesystems and
//! units. Each phase waits for its own devices before touching anything, and
//! the first failure ends the run. Nothing completed by an earlier phase is
//! rolled back.

use std::path::PathBuf;
use std::sync::Arc;

use firstboot_contracts::{
    CommandRunner, DeviceWaiter, FileWriter, Mounter, PartitionTable, ProvisionError,
};
use firstboot_sys::{
    AgentSettings, DestDir, HostCommandRunner, HostFileWriter, NixMounter, PollingDeviceWaiter,
    Sgdisk, ToolPaths,
};
use firstboot_types::Config;

use crate::filesystems::FilesystemBuilder;
use crate::logging::OpLogger;
use crate::partitions::PartitionTableWriter;
use crate::raid::RaidAssembler;
use crate::units::UnitWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Partitions,
    Raids,
    Filesystems,
    Units,
}

impl Phase {
    pub const FIRST: Phase = Phase::Partitions;

    pub fn next(self) -> Option<Phase> {
        match self {
            Self::Partitions => Some(Self::Raids),
            Self::Raids => Some(Self::Filesystems),
            Self::Filesystems => Some(Self::Units),
            Self::Units => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Partitions => "partitions",
            Self::Raids => "raids",
            Self::Filesystems => "filesystems",
            Self::Units => "units",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Self::Partitions => "create partitions failed",
            Self::Raids => "failed to create raids",
            Self::Filesystems => "failed to create filesystems",
            Self::Units => "failed to create units",
        }
    }
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Completed,
    Failed { phase: Phase, error: ProvisionError },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// The host capabilities the pipeline drives.
#[derive(Clone)]
pub struct Backends {
    pub waiter: Arc<dyn DeviceWaiter>,
    pub partitions: Arc<dyn PartitionTable>,
    pub runner: Arc<dyn CommandRunner>,
    pub mounter: Arc<dyn Mounter>,
    pub writer: Arc<dyn FileWriter>,
}

impl Backends {
    pub fn host(settings: &AgentSettings) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(HostCommandRunner);
        Self {
            waiter: Arc::new(PollingDeviceWaiter::new(
                settings.device_timeout(),
                settings.device_poll_interval(),
            )),
            partitions: Arc::new(Sgdisk::new(settings.tools.sgdisk(), runner.clone())),
            runner,
            mounter: Arc::new(NixMounter),
            writer: Arc::new(HostFileWriter),
        }
    }
}

pub struct StoragePipeline {
    logger: OpLogger,
    backends: Backends,
    tools: ToolPaths,
    root: DestDir,
    mount_parent: PathBuf,
}

impl StoragePipeline {
    pub fn new(logger: OpLogger, backends: Backends, settings: &AgentSettings) -> Self {
        Self {
            logger,
            backends,
            tools: settings.tools.clone(),
            root: DestDir::new(&settings.root),
            mount_parent: settings.mount_parent(),
        }
    }

    pub async fn run(&self, config: &Config) -> PipelineOutcome {
        if config.is_empty() {
            self.logger.info("no storage or units configured");
            return PipelineOutcome::Completed;
        }

        let mut phase = Some(Phase::FIRST);
        while let Some(current) = phase {
            self.logger
                .debug(format_args!("entering {} phase", current.name()));
            if let Err(error) = self.run_phase(current, config).await {
                self.logger
                    .crit(format_args!("{}: {error}", current.failure_message()));
                return PipelineOutcome::Failed {
                    phase: current,
                    error,
                };
            }
            phase = current.next();
        }

        PipelineOutcome::Completed
    }

    async fn run_phase(&self, phase: Phase, config: &Config) -> Result<(), ProvisionError> {
        let backends = &self.backends;
        match phase {
            Phase::Partitions => {
                PartitionTableWriter::new(
                    &self.logger,
                    backends.waiter.as_ref(),
                    backends.partitions.as_ref(),
                )
                .create_partitions(&config.storage)
                .await
            }
            Phase::Raids => {
                RaidAssembler::new(
                    &self.logger,
                    backends.waiter.as_ref(),
                    backends.runner.as_ref(),
                    self.tools.mdadm(),
                )
                .create_raids(&config.storage)
                .await
            }
            Phase::Filesystems => {
                FilesystemBuilder {
                    logger: &self.logger,
                    waiter: backends.waiter.as_ref(),
                    runner: backends.runner.as_ref(),
                    mounter: backends.mounter.as_ref(),
                    writer: backends.writer.as_ref(),
                    tools: &self.tools,
                    mount_parent: &self.mount_parent,
                }
                .create_filesystems(&config.storage)
                .await
            }
            Phase::Units => {
                UnitWriter::new(&self.logger, backends.writer.as_ref(), &self.root)
                    .create_units(config)
            }
        }
    }
}
