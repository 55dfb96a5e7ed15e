// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Heartbeat
//!
//! Keeps the orchestrator aware of this agent:
//!
//! - submit once on start, then again whenever the resubmit interval has
//!   elapsed (checked on poll ticks, so it may lag by up to one poll period)
//! - ping on every poll tick and record the time of the last success
//!
//! Failures are logged and otherwise ignored; the next tick is the retry.
//! [`HeartbeatStatus`] exposes the last successful contact to the status
//! endpoint.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::agent_config::AgentConfig;
use crate::domain::orchestrator::{AgentRegistration, OrchestratorGateway};

/// Shared "last successful contact with the orchestrator" timestamp.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatStatus {
    last_contact: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl HeartbeatStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_contact(&self) {
        self.record_contact_at(Utc::now());
    }

    pub fn record_contact_at(&self, at: DateTime<Utc>) {
        *self.last_contact.write() = Some(at);
    }

    pub fn last_contact(&self) -> Option<DateTime<Utc>> {
        *self.last_contact.read()
    }

    /// Healthy iff the orchestrator answered within `threshold`.
    pub fn is_healthy(&self, threshold: Duration) -> bool {
        self.is_healthy_at(Utc::now(), threshold)
    }

    pub fn is_healthy_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match self.last_contact() {
            Some(last) => match (now - last).to_std() {
                Ok(elapsed) => elapsed <= threshold,
                // contact recorded "in the future" (clock step)
                Err(_) => true,
            },
            None => false,
        }
    }
}

pub struct AgentHeartbeat {
    gateway: Arc<dyn OrchestratorGateway>,
    registration: AgentRegistration,
    poll_interval: Duration,
    resubmit_interval: Duration,
    status: HeartbeatStatus,
}

impl AgentHeartbeat {
    pub fn new(
        gateway: Arc<dyn OrchestratorGateway>,
        registration: AgentRegistration,
        poll_interval: Duration,
        resubmit_interval: Duration,
        status: HeartbeatStatus,
    ) -> Self {
        Self {
            gateway,
            registration,
            poll_interval,
            resubmit_interval,
            status,
        }
    }

    pub fn from_config(
        gateway: Arc<dyn OrchestratorGateway>,
        registration: AgentRegistration,
        config: &AgentConfig,
        status: HeartbeatStatus,
    ) -> Self {
        Self::new(
            gateway,
            registration,
            config.poll_interval(),
            config.resubmit_interval(),
            status,
        )
    }

    pub fn status(&self) -> HeartbeatStatus {
        self.status.clone()
    }

    async fn submit(&self) {
        debug!(
            "Submitting this agent: {}:{}",
            self.registration.hostname, self.registration.port
        );
        if let Err(e) = self.gateway.submit(&self.registration).await {
            warn!("Failed to submit agent to orchestrator: {}", e);
        }
    }

    async fn ping(&self) {
        match self.gateway.ping().await {
            Ok(()) => self.status.record_contact(),
            Err(e) => warn!("Failed to ping orchestrator server: {}", e),
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!("Starting continuous operation");
        self.submit().await;
        let mut last_submit = Instant::now();

        let mut ticker = tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Heartbeat stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.ping().await;
                    if last_submit.elapsed() >= self.resubmit_interval {
                        self.submit().await;
                        last_submit = Instant::now();
                    }
                }
            }
        }
    }
}
