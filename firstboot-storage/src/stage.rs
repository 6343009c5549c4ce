// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;

use async_trait::async_trait;
use firstboot_sys::AgentSettings;
use firstboot_types::Config;
use thiserror::Error;

use crate::logging::OpLogger;
use crate::pipeline::{Backends, StoragePipeline};

pub const STORAGE_STAGE: &str = "storage";

/// One step of the firstboot agent, run once against the full config.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns false when the stage failed; the reason has already been logged.
    async fn run(&self, config: &Config) -> bool;
}

pub trait StageCreator: Send + Sync {
    fn name(&self) -> &'static str;
    fn create(&self, logger: OpLogger, settings: &AgentSettings) -> Box<dyn Stage>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("unknown stage {name:?} (registered: {known})")]
    UnknownStage { name: String, known: String },
}

pub struct StorageStage {
    pipeline: StoragePipeline,
}

impl StorageStage {
    pub fn new(pipeline: StoragePipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Stage for StorageStage {
    fn name(&self) -> &'static str {
        STORAGE_STAGE
    }

    async fn run(&self, config: &Config) -> bool {
        self.pipeline.run(config).await.is_success()
    }
}

struct StorageStageCreator;

impl StageCreator for StorageStageCreator {
    fn name(&self) -> &'static str {
        STORAGE_STAGE
    }

    fn create(&self, logger: OpLogger, settings: &AgentSettings) -> Box<dyn Stage> {
        let backends = Backends::host(settings);
        Box::new(StorageStage::new(StoragePipeline::new(
            logger, backends, settings,
        )))
    }
}

#[derive(Default)]
pub struct StageRegistry {
    creators: BTreeMap<&'static str, Box<dyn StageCreator>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(StorageStageCreator));
        registry
    }

    pub fn register(&mut self, creator: Box<dyn StageCreator>) {
        self.creators.insert(creator.name(), creator);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.creators.keys().copied().collect()
    }

    pub fn create(
        &self,
        name: &str,
        logger: OpLogger,
        settings: &AgentSettings,
    ) -> Result<Box<dyn Stage>, StageError> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| StageError::UnknownStage {
                name: name.to_string(),
                known: self.names().join(", "),
            })?;
        Ok(creator.create(logger, settings))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fakes::{FakeHost, temp_dir};
    use firstboot_types::{Filesystem, Storage};

    #[test]
    fn storage_stage_is_registered_by_default() {
        let registry = StageRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["storage"]);

        let stage = registry
            .create("storage", OpLogger::new(), &AgentSettings::default())
            .unwrap();
        assert_eq!(stage.name(), "storage");
    }

    #[test]
    fn unknown_stage_lists_registered_names() {
        let registry = StageRegistry::with_defaults();
        let error = registry
            .create("files", OpLogger::new(), &AgentSettings::default())
            .err()
            .unwrap();
        assert_eq!(
            error,
            StageError::UnknownStage {
                name: "files".to_string(),
                known: "storage".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn stage_reports_pipeline_result() {
        let host = Arc::new(FakeHost::default());
        let dir = temp_dir("stage");
        let settings = AgentSettings {
            root: dir.clone(),
            mount_parent: Some(dir.clone()),
            ..Default::default()
        };
        let backends = Backends {
            waiter: host.clone(),
            partitions: host.clone(),
            runner: host.clone(),
            mounter: host.clone(),
            writer: host.clone(),
        };
        let stage = StorageStage::new(StoragePipeline::new(OpLogger::new(), backends, &settings));

        assert!(stage.run(&Config::default()).await);

        host.fail_wait_for("filesystems");
        let config = Config {
            storage: Storage {
                filesystems: vec![Filesystem {
                    device: "/dev/vdb".to_string(),
                    format: "xfs".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(!stage.run(&config).await);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
