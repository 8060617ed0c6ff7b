//! External command execution with categorized output capture.

use crate::error::{CommandError, Result};
use regex::Regex;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// MSBuild diagnostic, e.g. `Foo.cs(3,1): error CS1002: ; expected`
static MSBUILD_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[\s:])error\s+[A-Z]{2,}\d{3,}\s*:").expect("valid MSBuild error pattern")
});

/// Which stream a captured line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Regular progress output
    Info,
    /// Diagnostics that fail the command
    Error,
    /// Verbose tool chatter
    Debug,
}

/// Categorize one output line.
///
/// Anything on stderr is an error. On stdout, NuGet `error:` lines and
/// MSBuild `error XX1234:` diagnostics are errors, NuGet `trce:` and `log  :`
/// lines are debug, the rest is info.
pub fn categorize_line(line: &str, from_stderr: bool) -> OutputKind {
    if from_stderr {
        return OutputKind::Error;
    }

    let trimmed = line.trim_start();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("error:") || MSBUILD_ERROR.is_match(trimmed) {
        OutputKind::Error
    } else if lower.starts_with("trce:") || lower.starts_with("log  :") {
        OutputKind::Debug
    } else {
        OutputKind::Info
    }
}

/// Captured result of one command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Command line with secrets masked
    pub command: String,
    /// Exit code; `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Informational lines
    pub info: Vec<String>,
    /// Error lines
    pub errors: Vec<String>,
    /// Debug lines
    pub debug: Vec<String>,
}

impl CommandOutput {
    /// Route a line into the matching stream
    pub fn push_line(&mut self, line: String, from_stderr: bool) {
        if line.trim().is_empty() {
            return;
        }
        match categorize_line(&line, from_stderr) {
            OutputKind::Info => self.info.push(line),
            OutputKind::Error => self.errors.push(line),
            OutputKind::Debug => self.debug.push(line),
        }
    }

    /// Exit code zero and nothing on the error stream
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0) && self.errors.is_empty()
    }

    /// Info and error lines as one string
    pub fn text(&self) -> String {
        self.info
            .iter()
            .chain(&self.errors)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Turn a failed invocation into a fault
    pub fn ensure_success(&self) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }

        let reason = if self.errors.is_empty() {
            match self.exit_code {
                Some(code) => format!("exited with code {code}"),
                None => "terminated by signal".to_string(),
            }
        } else {
            self.errors.join("\n")
        };

        Err(CommandError::Failed {
            command: self.command.clone(),
            exit_code: self.exit_code,
            reason,
        }
        .into())
    }
}

/// Command line for display, with every secret replaced by `***`
pub fn display_command(program: &str, args: &[String], secrets: &[&str]) -> String {
    let mut line = std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        line = line.replace(secret, "***");
    }
    line
}

/// Run `program` to completion, capturing categorized output.
///
/// The child is killed when `timeout` expires. A non-zero exit is not an
/// error here; callers decide with [`CommandOutput::ensure_success`].
pub async fn run_command(
    program: &str,
    args: &[String],
    secrets: &[&str],
    timeout: Duration,
) -> Result<CommandOutput> {
    let command = display_command(program, args, secrets);
    log::debug!("Running: {command}");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CommandError::SpawnFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    let stderr_handle = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut captured = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                captured.push(line);
            }
            captured
        })
    });

    let stdout = child.stdout.take();
    let run = async {
        let mut captured = Vec::new();
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                captured.push(line);
            }
        }
        (captured, child.wait().await)
    };
    let outcome = tokio::time::timeout(timeout, run).await;

    let (stdout_lines, status) = match outcome {
        Ok((lines, Ok(status))) => (lines, status),
        Ok((_, Err(e))) => {
            return Err(CommandError::Failed {
                command,
                exit_code: None,
                reason: e.to_string(),
            }
            .into());
        }
        Err(_elapsed) => {
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill timed out process '{command}': {e}");
            }
            return Err(CommandError::TimedOut {
                command,
                seconds: timeout.as_secs(),
            }
            .into());
        }
    };

    let stderr_lines = match stderr_handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    };

    let mut output = CommandOutput {
        command,
        exit_code: status.code(),
        ..CommandOutput::default()
    };
    for line in stdout_lines {
        output.push_line(line, false);
    }
    for line in stderr_lines {
        output.push_line(line, true);
    }

    for line in &output.info {
        log::debug!("{line}");
    }
    for line in &output.debug {
        log::trace!("{line}");
    }
    for line in &output.errors {
        log::error!("{line}");
    }

    Ok(output)
}
