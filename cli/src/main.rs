// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Orchestrator Agent
//!
//! The `orchestrator-agent` binary runs on a MySQL host and exposes LVM,
//! mount, MySQL service and replication log operations to the orchestrator
//! over HTTP, while keeping itself registered through a periodic heartbeat.
//!
//! Configuration is discovered from the standard locations unless
//! `--config` names a file explicitly.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

mod daemon;

/// MySQL/LVM orchestrator agent
#[derive(Parser)]
#[command(name = "orchestrator-agent")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        env = "ORCHESTRATOR_AGENT_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Verbose output (info level)
    #[arg(long)]
    verbose: bool,

    /// Debug output (debug level, logs the process token)
    #[arg(long)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ORCHESTRATOR_AGENT_LOG_LEVEL", default_value = "error")]
    log_level: String,
}

impl Cli {
    fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            &self.log_level
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.effective_log_level())?;

    daemon::start_agent(cli.config).await
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
