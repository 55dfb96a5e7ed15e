// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Orchestrator Gateway
//!
//! Outbound contract towards the orchestrator's agents endpoint. The
//! heartbeat depends only on this trait; the HTTP implementation lives in
//! `crate::infrastructure::orchestrator_client`.

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::token::ProcessToken;

/// Identity announced on every submit.
#[derive(Debug, Clone)]
pub struct AgentRegistration {
    pub hostname: String,
    pub port: u16,
    pub token: ProcessToken,
}

#[async_trait]
pub trait OrchestratorGateway: Send + Sync {
    /// Announce (or re-announce) this agent.
    async fn submit(&self, registration: &AgentRegistration) -> Result<()>;

    /// Lightweight liveness call.
    async fn ping(&self) -> Result<()>;
}
