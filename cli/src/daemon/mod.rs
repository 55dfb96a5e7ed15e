// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent daemon
//!
//! Handles:
//! - Configuration checks before serving
//! - Process token hint file
//! - HTTP server and heartbeat lifecycle, with graceful shutdown

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use agent_core::domain::agent_config::AgentConfig;
use agent_core::domain::token::ProcessToken;

pub mod server;

pub use server::start_agent;

/// Reject settings this agent accepts in config files but cannot serve.
pub fn ensure_serving_supported(config: &AgentConfig) -> Result<()> {
    if config.use_ssl {
        bail!("UseSSL is not supported by this agent; terminate TLS in front of it and set UseSSL to false");
    }
    if config.use_mutual_tls {
        bail!("UseMutualTLS requires UseSSL, which is not supported by this agent");
    }
    Ok(())
}

/// Write the process token where local tooling can read it.
pub fn write_token_hint(path: &Path, token: &ProcessToken) -> Result<()> {
    std::fs::write(path, token.as_str())
        .with_context(|| format!("Failed to write token hint file: {:?}", path))?;
    info!("Wrote token hint file: {:?}", path);
    Ok(())
}
