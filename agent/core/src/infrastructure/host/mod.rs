// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Host Operations
//!
//! Shell-backed operations on the local host: LVM volumes and snapshots,
//! mount points and disk usage, and the MySQL service. Everything shells out
//! through [`CommandRunner`]; failures propagate unchanged as
//! [`AgentError`](crate::domain::error::AgentError).
//!
//! Commands touching devices or files owned by root are elevated with
//! [`CommandRunner::elevate`]. Operator-configured commands (service
//! start/stop, snapshot creation, custom commands) run exactly as configured.
//!
//! | File | Concern |
//! |------|---------|
//! | `lvm.rs` | `lvs`, `blkid`, `mount`, `umount`, `lvremove`, snapshot commands |
//! | `mount.rs` | mount table lookup, `du`, MySQL data path heuristic |
//! | `mysql.rs` | datadir, port, relay logs, service control, custom commands |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::agent_config::AgentConfig;
use crate::domain::error::{AgentError, Result};
use crate::infrastructure::command_runner::CommandRunner;

mod lvm;
mod mount;
mod mysql;

pub use lvm::{parse_fs_type, parse_logical_volumes};
pub use mount::{heuristic_datadir_candidates, parse_mount_entry};
pub use mysql::{parse_first_number, parse_relay_log_index};

const DEFAULT_MOUNT_TABLE: &str = "/etc/mtab";

#[derive(Clone)]
pub struct HostOperations {
    runner: CommandRunner,
    config: Arc<AgentConfig>,
    mount_table: PathBuf,
}

impl HostOperations {
    pub fn new(runner: CommandRunner, config: Arc<AgentConfig>) -> Self {
        Self {
            runner,
            config,
            mount_table: PathBuf::from(DEFAULT_MOUNT_TABLE),
        }
    }

    /// Read mounts from another table file (e.g. `/proc/mounts`).
    pub fn with_mount_table(mut self, path: impl AsRef<Path>) -> Self {
        self.mount_table = path.as_ref().to_path_buf();
        self
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    pub fn config(&self) -> &Arc<AgentConfig> {
        &self.config
    }

    pub fn hostname(&self) -> Result<String> {
        hostname::get()?
            .into_string()
            .map_err(|raw| AgentError::Parse(format!("hostname is not valid UTF-8: {:?}", raw)))
    }
}
