// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Seed Transfer Application Service
//!
//! Launches the operator-configured send / receive commands that stream a
//! MySQL data directory between hosts. Both calls return as soon as the
//! process has been spawned and registered; a background task owns the wait
//! and records the exit status, which callers poll through the
//! [`ProcessRegistry`].

use tracing::{debug, info, warn};

use crate::domain::error::{AgentError, Result};
use crate::domain::seed;
use crate::infrastructure::command_runner::{CommandRunner, RunningCommand};
use crate::infrastructure::host::HostOperations;
use crate::infrastructure::process_registry::ProcessRegistry;

#[derive(Clone)]
pub struct SeedTransferCoordinator {
    host: HostOperations,
    registry: ProcessRegistry,
}

impl SeedTransferCoordinator {
    pub fn new(host: HostOperations, registry: ProcessRegistry) -> Self {
        Self { host, registry }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    fn runner(&self) -> &CommandRunner {
        self.host.runner()
    }

    /// Start accepting seed data into the local MySQL datadir.
    pub async fn receive(&self, seed_id: &str) -> Result<()> {
        let datadir = self.host.mysql_datadir().await?;
        let cmd = seed::receive_command(&self.host.config().receive_seed_data_command, &datadir);
        let running = self.runner().spawn(&cmd)?;
        self.track(seed_id, running);
        info!("Receiving seed {} into {}", seed_id, datadir);
        Ok(())
    }

    /// Start streaming `directory` to `target_host`.
    pub async fn send(&self, target_host: &str, directory: &str, seed_id: &str) -> Result<()> {
        if directory.is_empty() {
            return Err(AgentError::EmptyDirectory);
        }
        let cmd = seed::send_command(
            &self.host.config().send_seed_data_command,
            directory,
            target_host,
        );
        let running = self.runner().spawn(&cmd)?;
        self.track(seed_id, running);
        info!("Sending seed {} from {} to {}", seed_id, directory, target_host);
        Ok(())
    }

    pub fn is_completed(&self, seed_id: &str) -> bool {
        self.registry.is_completed(seed_id)
    }

    pub fn is_successful(&self, seed_id: &str) -> bool {
        self.registry.is_successful(seed_id)
    }

    pub fn abort(&self, seed_id: &str) -> Result<()> {
        self.registry.abort(seed_id)
    }

    fn track(&self, seed_id: &str, running: RunningCommand) {
        self.registry.register(seed_id, running.handle());
        let seed_id = seed_id.to_string();
        tokio::spawn(async move {
            match running.wait().await {
                Ok(()) => debug!("Seed command for {} completed", seed_id),
                Err(e) => warn!("Seed command for {} failed: {}", seed_id, e),
            }
        });
    }
}
