use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, FramekitError};
use super::commands::MediaCommand;

/// Captured result of one external tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// stdout followed by stderr; ffmpeg writes its logs to stderr
    pub fn text(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Last non-empty line the tool printed to stderr
    pub fn last_line(&self) -> &str {
        self.stderr
            .split(['\n', '\r'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .unwrap_or("")
    }

    /// Fail unless the process exited successfully
    pub fn ensure_success(&self, description: &str) -> Result<()> {
        if self.success {
            return Ok(());
        }

        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        Err(FramekitError::Subprocess {
            description: description.to_string(),
            detail: format!("{}: {}", status, self.last_line()),
        })
    }
}

/// Runs media commands against the external tools
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and capture its output
    async fn run(&self, command: &MediaCommand) -> Result<ProcessOutput>;
}

/// Runs commands as child processes without a shell
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &MediaCommand) -> Result<ProcessOutput> {
        debug!("Executing media processing command: {}", command);
        debug!("Description: {}", command.description);

        let mut cmd = Command::new(&command.binary_path);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| {
            FramekitError::Media(format!("Failed to execute {}: {}", command.binary_path, e))
        })?;

        let result = ProcessOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        debug!(
            "{} exited with {:?} ({} bytes stdout, {} bytes stderr)",
            command.description,
            result.exit_code,
            result.stdout.len(),
            result.stderr.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::commands::Tool;

    #[test]
    fn test_ensure_success_reports_last_line() {
        let output = ProcessOutput {
            success: false,
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "Input #0, mov\r\nclip.mp4: Invalid data found when processing input\n".to_string(),
        };
        let err = output.ensure_success("Audio merge").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Audio merge failed: exit code 1: clip.mp4: Invalid data found when processing input"
        );
    }

    #[test]
    fn test_text_combines_streams() {
        let output = ProcessOutput {
            success: true,
            exit_code: Some(0),
            stdout: "1920x1080".to_string(),
            stderr: "warning".to_string(),
        };
        assert_eq!(output.text(), "1920x1080\nwarning");
        assert!(output.ensure_success("probe").is_ok());
    }

    #[tokio::test]
    async fn test_missing_binary_is_media_error() {
        let command = MediaCommand::new(Tool::Ffmpeg, "/nonexistent/bin/ffmpeg", "Version check").arg("-version");
        let err = ProcessRunner::new().run(&command).await.unwrap_err();
        assert!(matches!(err, FramekitError::Media(_)));
    }
}
