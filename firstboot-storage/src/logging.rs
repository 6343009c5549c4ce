// SPDX-License-Identifier: GPL-3.0-only

//! Operation logging for the storage stage
//!
//! [`OpLogger`] is handed to every component. It keeps a stack of prefixes
//! (`createFilesystems:createFiles`) that is attached to each event, and wraps
//! multi-step actions as named operations that log their start, completion
//! and failure.

use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use firstboot_contracts::{CommandOutcome, CommandRunner, ProvisionError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_DIRECTIVES: &str = "firstboot_storage=info,firstboot_sys=info,warn";

#[derive(Debug, Clone, Default)]
pub struct OpLogger {
    prefixes: Arc<Mutex<Vec<String>>>,
}

/// Pops the prefix pushed by [`OpLogger::push_prefix`] when dropped.
#[must_use = "the prefix is popped as soon as the guard is dropped"]
pub struct PrefixGuard {
    logger: OpLogger,
}

impl Drop for PrefixGuard {
    fn drop(&mut self) {
        self.logger.stack().pop();
    }
}

impl OpLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn stack(&self) -> MutexGuard<'_, Vec<String>> {
        self.prefixes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_prefix(&self, prefix: impl Into<String>) -> PrefixGuard {
        self.stack().push(prefix.into());
        PrefixGuard {
            logger: self.clone(),
        }
    }

    pub fn prefix(&self) -> String {
        self.stack().join(":")
    }

    pub fn debug(&self, message: impl Display) {
        tracing::debug!(prefix = %self.prefix(), "{message}");
    }

    pub fn info(&self, message: impl Display) {
        tracing::info!(prefix = %self.prefix(), "{message}");
    }

    pub fn notice(&self, message: impl Display) {
        tracing::info!(prefix = %self.prefix(), severity = "notice", "{message}");
    }

    pub fn warning(&self, message: impl Display) {
        tracing::warn!(prefix = %self.prefix(), "{message}");
    }

    pub fn crit(&self, message: impl Display) {
        tracing::error!(prefix = %self.prefix(), severity = "crit", "{message}");
    }

    /// Run `op` as a named operation.
    pub async fn log_op<T, E, F>(&self, description: impl Display, op: F) -> Result<T, E>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        let description = description.to_string();
        self.info(format_args!("[started]  {description}"));
        let result = op.await;
        self.finish(&description, &result);
        result
    }

    /// Synchronous counterpart of [`OpLogger::log_op`].
    pub fn log_op_sync<T, E, F>(&self, description: impl Display, op: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        let description = description.to_string();
        self.info(format_args!("[started]  {description}"));
        let result = op();
        self.finish(&description, &result);
        result
    }

    fn finish<T, E: Display>(&self, description: &str, result: &Result<T, E>) {
        match result {
            Ok(_) => self.info(format_args!("[finished] {description}")),
            Err(error) => self.crit(format_args!("[failed]   {description}: {error}")),
        }
    }

    /// Run an external command as a named operation, logging its output.
    pub async fn log_cmd(
        &self,
        runner: &dyn CommandRunner,
        program: &Path,
        args: &[String],
        description: impl Display,
    ) -> Result<CommandOutcome, ProvisionError> {
        let outcome = self
            .log_op(description, runner.run(program, args))
            .await?;

        if !outcome.stdout.trim().is_empty() {
            self.debug(format_args!("{} stdout: {}", outcome.command, outcome.stdout.trim()));
        }
        if !outcome.stderr.trim().is_empty() {
            self.debug(format_args!("{} stderr: {}", outcome.command, outcome.stderr.trim()));
        }

        Ok(outcome)
    }
}

/// Install the global subscriber: stderr always, plus an optional log file.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter());

    let Some(log_file) = log_file else {
        tracing_subscriber::registry().with(stderr_layer).init();
        return None;
    };

    let (dir, file_name) = split_log_path(log_file);
    if let Err(error) = std::fs::create_dir_all(&dir) {
        eprintln!(
            "firstboot-storage: failed to create log directory {}: {error}",
            dir.display()
        );
        tracing_subscriber::registry().with(stderr_layer).init();
        return None;
    }

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Some(guard)
}

fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("firstboot-storage.log"));
    (dir, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_nest_and_pop_on_drop() {
        let logger = OpLogger::new();
        {
            let _outer = logger.push_prefix("createFilesystems");
            {
                let _inner = logger.push_prefix("createFiles");
                assert_eq!(logger.prefix(), "createFilesystems:createFiles");
            }
            assert_eq!(logger.prefix(), "createFilesystems");
        }
        assert_eq!(logger.prefix(), "");
    }

    #[test]
    fn clones_share_the_prefix_stack() {
        let logger = OpLogger::new();
        let clone = logger.clone();
        let _guard = logger.push_prefix("createRaids");
        assert_eq!(clone.prefix(), "createRaids");
    }

    #[test]
    fn log_op_sync_returns_inner_result() {
        let logger = OpLogger::new();
        let ok: Result<u32, String> = logger.log_op_sync("adding", || Ok(2 + 2));
        assert_eq!(ok, Ok(4));

        let failed: Result<(), String> =
            logger.log_op_sync("failing", || Err("boom".to_string()));
        assert_eq!(failed, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn log_op_awaits_inner_future() {
        let logger = OpLogger::new();
        let result: Result<&str, String> = logger.log_op("waiting", async { Ok("done") }).await;
        assert_eq!(result, Ok("done"));
    }

    #[test]
    fn log_path_splits_into_dir_and_name() {
        let (dir, name) = split_log_path(Path::new("/run/firstboot/storage.log"));
        assert_eq!(dir, PathBuf::from("/run/firstboot"));
        assert_eq!(name, PathBuf::from("storage.log"));

        let (dir, name) = split_log_path(Path::new("storage.log"));
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, PathBuf::from("storage.log"));
    }
}
