// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Process Registry
//!
//! Tracks long-running shell processes (seed transfers) by caller-supplied id
//! so that completion can be polled and transfers aborted from later,
//! unrelated requests.
//!
//! Registering an id that is already present replaces the previous handle; the
//! replaced process keeps running but can no longer be observed. Entries are
//! never evicted and live as long as the agent process.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::error::Result;
use crate::infrastructure::command_runner::ProcessHandle;

#[derive(Clone, Default)]
pub struct ProcessRegistry {
    processes: Arc<Mutex<HashMap<String, Arc<ProcessHandle>>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: &str, handle: Arc<ProcessHandle>) {
        if let Some(previous) = self.processes.lock().insert(id.to_string(), handle) {
            debug!(
                "Replacing tracked process for {} (pid {:?})",
                id,
                previous.pid()
            );
        }
    }

    fn get(&self, id: &str) -> Option<Arc<ProcessHandle>> {
        self.processes.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.processes.lock().contains_key(id)
    }

    /// True once the process for `id` has exited, whatever its status.
    pub fn is_completed(&self, id: &str) -> bool {
        self.get(id).map(|h| h.has_exited()).unwrap_or(false)
    }

    /// True only when the process for `id` exited with status 0.
    pub fn is_successful(&self, id: &str) -> bool {
        self.get(id).map(|h| h.succeeded()).unwrap_or(false)
    }

    /// Signal the process for `id` to terminate without waiting for it.
    /// Unknown ids are a no-op.
    pub fn abort(&self, id: &str) -> Result<()> {
        match self.get(id) {
            Some(handle) => handle.terminate(),
            None => {
                debug!("Not killing: Process not found for {}", id);
                Ok(())
            }
        }
    }
}
