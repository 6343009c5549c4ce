// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;

use crate::ProvisionError;

#[async_trait]
pub trait DeviceWaiter: Send + Sync {
    /// Block until every path in `devices` is a device node known to the
    /// kernel. `context` only labels diagnostics and the timeout error.
    async fn wait(&self, devices: &[String], context: &str) -> Result<(), ProvisionError>;
}
