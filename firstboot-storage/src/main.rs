// SPDX-License-Identifier: GPL-3.0-only

//! firstboot-storage - provisions disks, RAID, filesystems and units from a
//! declarative config before the target system boots.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use firstboot_storage::{OpLogger, STORAGE_STAGE, StageRegistry, logging};
use firstboot_sys::AgentSettings;
use firstboot_types::Config;

#[derive(Debug, Parser)]
#[command(name = "firstboot-storage", version, about)]
struct Cli {
    /// Agent settings (TOML)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Root filesystem of the system being provisioned
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Seconds to wait for devices to appear
    #[arg(long, value_name = "SECS")]
    device_timeout: Option<u64>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE", env = "FIRSTBOOT_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[arg(long, default_value = STORAGE_STAGE)]
    stage: String,

    /// Skip the root check (for test rigs)
    #[arg(long)]
    allow_unprivileged: bool,

    /// Provisioning config (JSON, or TOML with a .toml extension)
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_file.as_deref());

    tracing::info!("Starting firstboot-storage v{}", env!("CARGO_PKG_VERSION"));

    if !cli.allow_unprivileged && unsafe { libc::geteuid() } != 0 {
        tracing::error!("firstboot-storage must run as root");
        anyhow::bail!("firstboot-storage must run with root privileges");
    }

    let mut settings = match &cli.settings {
        Some(path) => AgentSettings::load(path)?,
        None => AgentSettings::default(),
    };
    if let Some(root) = cli.root {
        settings.root = root;
    }
    if let Some(secs) = cli.device_timeout {
        settings.device_timeout_secs = secs;
    }

    let config = Config::load(&cli.config)?;
    config
        .check()
        .with_context(|| format!("rejecting config {}", cli.config.display()))?;

    let stage = StageRegistry::with_defaults().create(&cli.stage, OpLogger::new(), &settings)?;
    tracing::info!(
        "Running stage {} against root {}",
        stage.name(),
        settings.root.display()
    );

    if !stage.run(&config).await {
        anyhow::bail!("stage {} failed", stage.name());
    }

    tracing::info!("Stage {} completed", stage.name());
    Ok(())
}
