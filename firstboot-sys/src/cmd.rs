// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use firstboot_contracts::{CommandOutcome, CommandRunner, ProvisionError, render_command};
use tokio::process::Command;

/// Runs external tools as child processes and waits for them to exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCommandRunner;

#[async_trait]
impl CommandRunner for HostCommandRunner {
    async fn run(&self, program: &Path, args: &[String]) -> Result<CommandOutcome, ProvisionError> {
        let rendered = render_command(program, args);
        tracing::debug!(command = %rendered, "executing");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|error| ProvisionError::ExternalTool {
                command: rendered.clone(),
                status: None,
                stderr: error.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(ProvisionError::ExternalTool {
                command: rendered,
                status: output.status.code(),
                stderr,
            });
        }

        Ok(CommandOutcome {
            command: rendered,
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firstboot_contracts::ProvisionErrorKind;

    #[tokio::test]
    async fn captures_output_of_successful_command() {
        let args = vec!["-c".to_string(), "echo formatted".to_string()];
        let outcome = HostCommandRunner.run(Path::new("sh"), &args).await.unwrap();
        assert_eq!(outcome.stdout.trim(), "formatted");
        assert_eq!(outcome.command, "sh -c echo formatted");
    }

    #[tokio::test]
    async fn non_zero_exit_is_external_tool_error() {
        let args = vec!["-c".to_string(), "echo busy >&2; exit 3".to_string()];
        let error = HostCommandRunner.run(Path::new("sh"), &args).await.unwrap_err();

        assert_eq!(error.kind(), ProvisionErrorKind::ExternalTool);
        let ProvisionError::ExternalTool { status, stderr, .. } = error else {
            panic!("expected external tool error");
        };
        assert_eq!(status, Some(3));
        assert_eq!(stderr.trim(), "busy");
    }

    #[tokio::test]
    async fn missing_binary_is_external_tool_error() {
        let error = HostCommandRunner
            .run(Path::new("/nonexistent/mkfs.none"), &[])
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ProvisionErrorKind::ExternalTool);
    }
}
