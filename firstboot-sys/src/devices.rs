// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use firstboot_contracts::{DeviceWaiter, ProvisionError};
use futures_util::future::join_all;

/// Waits for device nodes by polling every requested path concurrently.
///
/// Symlinks such as `/dev/disk/by-label/ROOT` are followed, so the wait ends
/// once udev has created both the node and the link.
#[derive(Debug, Clone)]
pub struct PollingDeviceWaiter {
    timeout: Duration,
    poll_interval: Duration,
}

impl PollingDeviceWaiter {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    async fn wait_one(&self, path: &Path) {
        while !is_device_node(path) {
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

pub fn is_device_node(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| {
            let file_type = metadata.file_type();
            file_type.is_block_device() || file_type.is_char_device()
        })
        .unwrap_or(false)
}

fn unique_in_order(devices: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    devices
        .iter()
        .map(String::as_str)
        .filter(|device| seen.insert(*device))
        .collect()
}

#[async_trait]
impl DeviceWaiter for PollingDeviceWaiter {
    async fn wait(&self, devices: &[String], context: &str) -> Result<(), ProvisionError> {
        let devices = unique_in_order(devices);
        if devices.is_empty() {
            return Ok(());
        }

        let pending = devices.iter().map(|device| self.wait_one(Path::new(device)));
        if tokio::time::timeout(self.timeout, join_all(pending)).await.is_ok() {
            return Ok(());
        }

        let missing: Vec<String> = devices
            .into_iter()
            .filter(|device| !is_device_node(Path::new(device)))
            .map(ToString::to_string)
            .collect();
        tracing::warn!(context, ?missing, "devices did not appear in time");

        Err(ProvisionError::DeviceTimeout {
            context: context.to_string(),
            missing,
        })
    }
}
