// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent HTTP server and heartbeat startup

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use agent_core::application::{AgentHeartbeat, HeartbeatStatus};
use agent_core::domain::agent_config::AgentConfig;
use agent_core::domain::orchestrator::AgentRegistration;
use agent_core::domain::token::ProcessToken;
use agent_core::infrastructure::HttpOrchestratorClient;
use agent_core::presentation::{app, AppState};

use super::{ensure_serving_supported, write_token_hint};

pub async fn start_agent(config_path: Option<PathBuf>) -> Result<()> {
    let config = AgentConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    ensure_serving_supported(&config)?;
    let config = Arc::new(config);

    let token = ProcessToken::generate();
    debug!("Process token: {}", token);
    if !config.token_hint_file.is_empty() {
        write_token_hint(Path::new(&config.token_hint_file), &token)?;
    }

    let heartbeat_status = HeartbeatStatus::new();
    let state = AppState::new(config.clone(), token.clone(), heartbeat_status.clone());

    let hostname = state.host.hostname().context("Failed to resolve hostname")?;
    let registration = AgentRegistration {
        hostname,
        port: config.http_port,
        token,
    };
    let gateway = Arc::new(
        HttpOrchestratorClient::from_config(&config)
            .context("Failed to initialize orchestrator client")?,
    );
    let heartbeat = AgentHeartbeat::from_config(gateway, registration, &config, heartbeat_status);

    let cancel = CancellationToken::new();
    let heartbeat_task = tokio::spawn(heartbeat.run(cancel.clone()));

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Starting HTTP on port {}", config.http_port);

    let served = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    cancel.cancel();
    if let Err(e) = heartbeat_task.await {
        error!("Heartbeat task ended abnormally: {}", e);
    }

    info!("Agent shutting down");

    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
