// SPDX-License-Identifier: GPL-3.0-only

use firstboot_contracts::{DeviceWaiter, ProvisionError};

use crate::logging::OpLogger;

/// Wait for exactly the devices a phase is about to touch, as a logged
/// operation labelled with `context`.
pub(crate) async fn wait_on_devices(
    logger: &OpLogger,
    waiter: &dyn DeviceWaiter,
    devices: &[String],
    context: &str,
) -> Result<(), ProvisionError> {
    if devices.is_empty() {
        return Ok(());
    }

    logger
        .log_op(
            format!("waiting for devices {devices:?}"),
            waiter.wait(devices, context),
        )
        .await
        .map_err(|error| error.with_context(format!("failed to wait on {context} devs")))
}
