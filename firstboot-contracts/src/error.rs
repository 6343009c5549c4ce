// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Root category of a [`ProvisionError`], independent of any context layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionErrorKind {
    DeviceTimeout,
    Commit,
    ExternalTool,
    UnsupportedFormat,
    Mount,
    Unmount,
    Io,
    Config,
}

/// Errors raised while provisioning storage. All of them are fatal to the run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("timed out waiting for {context} devices: {missing:?}")]
    DeviceTimeout {
        context: String,
        missing: Vec<String>,
    },

    #[error("commit failure on {device}: {reason}")]
    Commit { device: String, reason: String },

    #[error("{command} failed (exit status {status:?}): {stderr}")]
    ExternalTool {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("unsupported filesystem format: {0:?}")]
    UnsupportedFormat(String),

    #[error("failed to mount device {device:?} at {target:?}: {reason}")]
    Mount {
        device: String,
        target: PathBuf,
        reason: String,
    },

    #[error("failed to unmount {target:?}: {reason}")]
    Unmount { target: PathBuf, reason: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ProvisionError>,
    },
}

impl ProvisionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap the error with the identity of whatever was being processed.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ProvisionErrorKind {
        match self {
            Self::Context { source, .. } => source.kind(),
            Self::DeviceTimeout { .. } => ProvisionErrorKind::DeviceTimeout,
            Self::Commit { .. } => ProvisionErrorKind::Commit,
            Self::ExternalTool { .. } => ProvisionErrorKind::ExternalTool,
            Self::UnsupportedFormat(_) => ProvisionErrorKind::UnsupportedFormat,
            Self::Mount { .. } => ProvisionErrorKind::Mount,
            Self::Unmount { .. } => ProvisionErrorKind::Unmount,
            Self::Io { .. } => ProvisionErrorKind::Io,
            Self::Config(_) => ProvisionErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_sees_through_context_layers() {
        let error = ProvisionError::UnsupportedFormat("zfs".to_string())
            .with_context("failed to create filesystem on \"/dev/sda1\"")
            .with_context("failed to create filesystems");

        assert_eq!(error.kind(), ProvisionErrorKind::UnsupportedFormat);
        assert!(error.to_string().ends_with("unsupported filesystem format: \"zfs\""));
    }

    #[test]
    fn context_renders_as_chain() {
        let error = ProvisionError::Commit {
            device: "/dev/sda".to_string(),
            reason: "sgdisk exited 4".to_string(),
        }
        .with_context("partitioning \"/dev/sda\"");

        assert_eq!(
            error.to_string(),
            "partitioning \"/dev/sda\": commit failure on /dev/sda: sgdisk exited 4"
        );
    }

    #[test]
    fn device_timeout_names_context() {
        let error = ProvisionError::DeviceTimeout {
            context: "raids".to_string(),
            missing: vec!["/dev/sdb1".to_string()],
        };
        let message = error.to_string();
        assert!(message.contains("raids"));
        assert!(message.contains("/dev/sdb1"));
    }
}
