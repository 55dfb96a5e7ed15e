// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Orchestrator HTTP Client
//!
//! reqwest-backed [`OrchestratorGateway`] talking to the orchestrator's
//! agents endpoint (`AgentsServer` + `AgentsServerPort`).
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Submit and ping calls for the heartbeat
//! - **Integration:** Agent heartbeat → HTTP → orchestrator

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::domain::agent_config::AgentConfig;
use crate::domain::error::{AgentError, Result};
use crate::domain::orchestrator::{AgentRegistration, OrchestratorGateway};

pub struct HttpOrchestratorClient {
    base_url: String,
    client: Client,
}

impl HttpOrchestratorClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, skip_verify: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(skip_verify)
            .build()
            .map_err(|e| AgentError::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Self::new(
            config.agents_base_url(),
            config.http_timeout(),
            config.ssl_skip_verify,
        )
    }

    async fn get(&self, path: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AgentError::Http(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Http(format!("GET {}: status {}", url, status)));
        }
        Ok(())
    }
}

#[async_trait]
impl OrchestratorGateway for HttpOrchestratorClient {
    async fn submit(&self, registration: &AgentRegistration) -> Result<()> {
        self.get(&format!(
            "/api/submit-agent/{}/{}/{}",
            registration.hostname, registration.port, registration.token
        ))
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.get("/api/agent-ping").await
    }
}
