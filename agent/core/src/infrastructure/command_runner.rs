// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Shell Command Runner
//!
//! Every host interaction of the agent goes through here. The command text is
//! written to a scoped temporary script and executed with `bash <script>`, so
//! long, heavily quoted pipelines never hit argv length or escaping limits.
//! The script is a [`tempfile::NamedTempFile`] owned for the duration of the
//! process; dropping it removes the file on every exit path.
//!
//! Each command runs in its own process group so that an abort reaches the
//! whole pipeline, not just the wrapping `bash`.

use parking_lot::Mutex;
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::domain::error::{AgentError, Result};

const SCRIPT_PREFIX: &str = "orchestrator-agent-cmd-";

/// A spawned shell process as seen by observers other than its owner.
///
/// The owning task records the exit status once `wait` returns; observers only
/// read it.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    command: String,
    status: Mutex<Option<ExitStatus>>,
}

impl ProcessHandle {
    fn new(pid: Option<u32>, command: String) -> Self {
        Self {
            pid,
            command,
            status: Mutex::new(None),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.status.lock()
    }

    pub fn has_exited(&self) -> bool {
        self.status.lock().is_some()
    }

    pub fn succeeded(&self) -> bool {
        self.status.lock().map(|s| s.success()).unwrap_or(false)
    }

    fn record_exit(&self, status: ExitStatus) {
        *self.status.lock() = Some(status);
    }

    /// Send SIGTERM to the process group. No-op once the process has exited.
    pub fn terminate(&self) -> Result<()> {
        if self.has_exited() {
            return Ok(());
        }
        let Some(pid) = self.pid else {
            return Ok(());
        };
        debug!("Killing process group {}", pid);
        // SAFETY: kill(2) with a negative pid signals the process group we
        // created at spawn time; it has no memory-safety preconditions.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGTERM) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            // ESRCH: the group is already gone
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(AgentError::command(self.command.clone(), err));
            }
        }
        Ok(())
    }
}

/// A running command together with the script file backing it.
pub struct RunningCommand {
    child: Child,
    handle: Arc<ProcessHandle>,
    _script: NamedTempFile,
}

impl RunningCommand {
    pub fn handle(&self) -> Arc<ProcessHandle> {
        self.handle.clone()
    }

    /// Block until exit, record the status on the handle and remove the script.
    pub async fn wait(mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| AgentError::command(self.handle.command.clone(), e))?;
        self.handle.record_exit(status);
        check_status(&self.handle.command, status, &[])
    }
}

fn describe_status(status: ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exit status {}", code),
        (None, Some(signal)) => format!("terminated by signal {}", signal),
        _ => "abnormal termination".to_string(),
    }
}

fn check_status(command: &str, status: ExitStatus, stderr: &[u8]) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    let reason = if stderr.is_empty() {
        describe_status(status)
    } else {
        format!("{}: {}", describe_status(status), stderr)
    };
    Err(AgentError::command(command, reason))
}

/// Runs shell commands through scoped script files.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    exec_with_sudo: bool,
}

impl CommandRunner {
    pub fn new(exec_with_sudo: bool) -> Self {
        Self { exec_with_sudo }
    }

    /// Prefix a privileged command with `sudo` when configured to.
    pub fn elevate(&self, command: &str) -> String {
        if self.exec_with_sudo {
            format!("sudo {}", command)
        } else {
            command.to_string()
        }
    }

    fn write_script(command: &str) -> Result<NamedTempFile> {
        let mut script = tempfile::Builder::new().prefix(SCRIPT_PREFIX).tempfile()?;
        script.write_all(command.as_bytes())?;
        script.flush()?;
        Ok(script)
    }

    fn build(script: &NamedTempFile) -> Command {
        let mut cmd = Command::new("bash");
        cmd.arg(script.path()).stdin(Stdio::null()).process_group(0);
        cmd
    }

    /// Run to completion and return standard output.
    ///
    /// Empty output with exit status 0 is `Ok(vec![])`.
    pub async fn run_capture(&self, command: &str) -> Result<Vec<u8>> {
        debug!("execCmd: {}", command);
        let script = Self::write_script(command)?;
        let output = Self::build(&script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AgentError::command(command, e))?;
        drop(script);

        check_status(command, output.status, &output.stderr)?;
        Ok(output.stdout)
    }

    /// Like [`run_capture`](Self::run_capture), decoded as trimmed text.
    pub async fn run_text(&self, command: &str) -> Result<String> {
        let output = self.run_capture(command).await?;
        Ok(String::from_utf8_lossy(&output).trim().to_string())
    }

    /// Spawn without waiting. Output is discarded.
    pub fn spawn(&self, command: &str) -> Result<RunningCommand> {
        debug!("execCmd: {}", command);
        let script = Self::write_script(command)?;
        let child = Self::build(&script)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AgentError::command(command, e))?;
        let handle = Arc::new(ProcessHandle::new(child.id(), command.to_string()));
        Ok(RunningCommand {
            child,
            handle,
            _script: script,
        })
    }

    /// Spawn, hand the live handle to `on_start`, then wait for exit.
    pub async fn run_async<F>(&self, command: &str, on_start: F) -> Result<()>
    where
        F: FnOnce(Arc<ProcessHandle>),
    {
        let running = self.spawn(command)?;
        on_start(running.handle());
        running.wait().await
    }
}

/// Non-empty lines of command output, trailing newlines stripped.
pub fn output_lines(output: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(output)
        .trim_matches('\n')
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whitespace-separated tokens of each non-empty output line.
pub fn output_tokens(output: &[u8]) -> Vec<Vec<String>> {
    output_lines(output)
        .iter()
        .map(|line| line.split_whitespace().map(str::to_string).collect())
        .filter(|tokens: &Vec<String>| !tokens.is_empty())
        .collect()
}
