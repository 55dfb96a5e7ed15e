// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent error taxonomy
//!
//! Every failure the agent can report to its HTTP callers. Errors raised by
//! shell commands travel unchanged through the binlog and seed services up to
//! the API layer, which renders them as `{"Code":"ERROR","Message":...}`.
//!
//! An unknown seed id on abort is intentionally *not* represented here: the
//! registry treats it as a successful no-op.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// External command failed to spawn or exited non-zero.
    #[error("Command failed: {command}: {reason}")]
    CommandExecution { command: String, reason: String },

    #[error("No binlog files provided")]
    NoFiles,

    #[error("Empty directory in seed send")]
    EmptyDirectory,

    #[error("Failed to decode relay log contents: {0}")]
    Decode(String),

    #[error("Failed to parse command output: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Refused: {0}")]
    Refused(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Orchestrator request failed: {0}")]
    Http(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AgentError {
    pub fn command(command: impl Into<String>, reason: impl ToString) -> Self {
        Self::CommandExecution {
            command: command.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
