// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Configuration
//!
//! Every operator-supplied knob of the agent: shell command templates for the
//! MySQL service and seed transfer, orchestrator endpoint, HTTP listener
//! settings and heartbeat intervals. Keys keep the names used by existing
//! `orchestrator-agent.conf.json` files so those files load unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::error::{AgentError, Result};

/// Files searched, in order, when no explicit config path is given.
/// A later file overrides only the keys it sets.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/orchestrator-agent.conf.json",
    "conf/orchestrator-agent.conf.json",
    "orchestrator-agent.conf.json",
];

/// Path roots served by the agent API itself. `StatusEndpoint` may not equal
/// one of these or live underneath it.
pub const RESERVED_API_PATHS: &[&str] = &[
    "/api/hostname",
    "/api/lvs",
    "/api/lvs-snapshots",
    "/api/lv",
    "/api/mount",
    "/api/mountlv",
    "/api/removelv",
    "/api/umount",
    "/api/du",
    "/api/mysql-du",
    "/api/create-snapshot",
    "/api/available-snapshots-local",
    "/api/available-snapshots",
    "/api/mysql-error-log-tail",
    "/api/mysql-port",
    "/api/mysql-status",
    "/api/mysql-stop",
    "/api/mysql-start",
    "/api/delete-mysql-datadir",
    "/api/mysql-datadir-available-space",
    "/api/post-copy",
    "/api/receive-mysql-seed-data",
    "/api/send-mysql-seed-data",
    "/api/abort-seed",
    "/api/seed-command-completed",
    "/api/seed-command-succeeded",
    "/api/mysql-relay-log-index-file",
    "/api/mysql-relay-log-files",
    "/api/mysql-relay-log-end-coordinates",
    "/api/mysql-binlog-contents",
    "/api/mysql-binlog-binary-contents",
    "/api/mysql-relaylog-contents-tail",
    "/api/apply-relaylog-contents",
    "/api/custom-commands",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// The single, agreed-upon mount point for logical volume snapshots
    #[serde(rename = "SnapshotMountPoint")]
    pub snapshot_mount_point: String,

    /// Poll interval for the heartbeat loop
    #[serde(rename = "ContinuousPollSeconds")]
    pub continuous_poll_seconds: u64,

    /// Interval for re-announcing this agent to the orchestrator
    #[serde(rename = "ResubmitAgentIntervalMinutes")]
    pub resubmit_agent_interval_minutes: u64,

    #[serde(rename = "CreateSnapshotCommand")]
    pub create_snapshot_command: String,

    /// Lists hosts (one per line) with snapshots in the local datacenter
    #[serde(rename = "AvailableLocalSnapshotHostsCommand")]
    pub available_local_snapshot_hosts_command: String,

    /// Lists hosts (one per line) with snapshots in any datacenter
    #[serde(rename = "AvailableSnapshotHostsCommand")]
    pub available_snapshot_hosts_command: String,

    /// Text pattern filtering logical volumes that are valid snapshots
    #[serde(rename = "SnapshotVolumesFilter")]
    pub snapshot_volumes_filter: String,

    /// Prints @@datadir
    #[serde(rename = "MySQLDatadirCommand")]
    pub mysql_datadir_command: String,

    /// Prints @@port
    #[serde(rename = "MySQLPortCommand")]
    pub mysql_port_command: String,

    /// Deletes the datadir content, not the directory itself
    #[serde(rename = "MySQLDeleteDatadirContentCommand")]
    pub mysql_delete_datadir_content_command: String,

    #[serde(rename = "MySQLServiceStopCommand")]
    pub mysql_service_stop_command: String,

    #[serde(rename = "MySQLServiceStartCommand")]
    pub mysql_service_start_command: String,

    /// Exits 0 when MySQL runs, non-zero otherwise
    #[serde(rename = "MySQLServiceStatusCommand")]
    pub mysql_service_status_command: String,

    /// Accepts incoming seed data; invoked as `<cmd> <datadir> <port>`
    #[serde(rename = "ReceiveSeedDataCommand")]
    pub receive_seed_data_command: String,

    /// Sends seed data; invoked as `<cmd> <directory> <target host> <port>`
    #[serde(rename = "SendSeedDataCommand")]
    pub send_seed_data_command: String,

    /// Runs after a seed copy completes and before MySQL starts
    #[serde(rename = "PostCopyCommand")]
    pub post_copy_command: String,

    /// Fully-privileged `mysql` client invocation used to apply relay logs
    #[serde(rename = "MySQLClientCommand")]
    pub mysql_client_command: String,

    /// Log-reader tool used to render and apply binary logs
    #[serde(rename = "MySQLBinlogCommand")]
    pub mysql_binlog_command: String,

    /// HTTP address of the orchestrator agents server
    #[serde(rename = "AgentsServer")]
    pub agents_server: String,

    /// Appended verbatim to `AgentsServer`, e.g. ":3001"
    #[serde(rename = "AgentsServerPort")]
    pub agents_server_port: String,

    #[serde(rename = "HTTPPort")]
    pub http_port: u16,

    /// Basic auth user; blank disables authentication
    #[serde(rename = "HTTPAuthUser")]
    pub http_auth_user: String,

    #[serde(rename = "HTTPAuthPassword")]
    pub http_auth_password: String,

    #[serde(rename = "UseSSL")]
    pub use_ssl: bool,

    #[serde(rename = "UseMutualTLS")]
    pub use_mutual_tls: bool,

    /// Ignore certificate errors when talking to the orchestrator
    #[serde(rename = "SSLSkipVerify")]
    pub ssl_skip_verify: bool,

    #[serde(rename = "SSLPrivateKeyFile")]
    pub ssl_private_key_file: String,

    #[serde(rename = "SSLCertFile")]
    pub ssl_cert_file: String,

    #[serde(rename = "SSLCAFile")]
    pub ssl_ca_file: String,

    #[serde(rename = "SSLValidOUs")]
    pub ssl_valid_ous: Vec<String>,

    #[serde(rename = "StatusEndpoint")]
    pub status_endpoint: String,

    #[serde(rename = "StatusOUVerify")]
    pub status_ou_verify: bool,

    /// Report unhealthy when the orchestrator was unreachable this long
    #[serde(rename = "StatusBadSeconds")]
    pub status_bad_seconds: u64,

    #[serde(rename = "HttpTimeoutSeconds")]
    pub http_timeout_seconds: u64,

    /// Prefix privileged host commands with sudo
    #[serde(rename = "ExecWithSudo")]
    pub exec_with_sudo: bool,

    /// Commands exposed through `/api/custom-commands/{cmd}`
    #[serde(rename = "CustomCommands")]
    pub custom_commands: HashMap<String, String>,

    /// If set, the process token is written to this file on startup
    #[serde(rename = "TokenHintFile")]
    pub token_hint_file: String,

    /// If set, header carrying the token (alternative to `?token=`)
    #[serde(rename = "TokenHttpHeader")]
    pub token_http_header: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            snapshot_mount_point: String::new(),
            continuous_poll_seconds: 60,
            resubmit_agent_interval_minutes: 60,
            create_snapshot_command: String::new(),
            available_local_snapshot_hosts_command: String::new(),
            available_snapshot_hosts_command: String::new(),
            snapshot_volumes_filter: String::new(),
            mysql_datadir_command: String::new(),
            mysql_port_command: String::new(),
            mysql_delete_datadir_content_command: String::new(),
            mysql_service_stop_command: String::new(),
            mysql_service_start_command: String::new(),
            mysql_service_status_command: String::new(),
            receive_seed_data_command: String::new(),
            send_seed_data_command: String::new(),
            post_copy_command: String::new(),
            mysql_client_command: "mysql".to_string(),
            mysql_binlog_command: "mysqlbinlog".to_string(),
            agents_server: String::new(),
            agents_server_port: String::new(),
            http_port: 3002,
            http_auth_user: String::new(),
            http_auth_password: String::new(),
            use_ssl: false,
            use_mutual_tls: false,
            ssl_skip_verify: false,
            ssl_private_key_file: String::new(),
            ssl_cert_file: String::new(),
            ssl_ca_file: String::new(),
            ssl_valid_ous: vec![],
            status_endpoint: "/api/status".to_string(),
            status_ou_verify: false,
            status_bad_seconds: 300,
            http_timeout_seconds: 10,
            exec_with_sudo: false,
            custom_commands: HashMap::new(),
            token_hint_file: String::new(),
            token_http_header: String::new(),
        }
    }
}

impl AgentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.continuous_poll_seconds)
    }

    pub fn resubmit_interval(&self) -> Duration {
        Duration::from_secs(self.resubmit_agent_interval_minutes * 60)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn status_threshold(&self) -> Duration {
        Duration::from_secs(self.status_bad_seconds)
    }

    /// Base URL of the orchestrator agents API
    pub fn agents_base_url(&self) -> String {
        format!("{}{}", self.agents_server, self.agents_server_port)
    }

    /// Parse a single configuration document into a JSON object.
    ///
    /// `.yaml` / `.yml` files are read as YAML, everything else as JSON.
    fn read_document(path: &Path) -> Result<serde_json::Value> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let value: serde_json::Value = if is_yaml {
            serde_yaml::from_str(&content)
                .map_err(|e| AgentError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| AgentError::Config(format!("{}: {}", path.display(), e)))?
        };
        if !value.is_object() {
            return Err(AgentError::Config(format!(
                "{}: expected a key/value document",
                path.display()
            )));
        }
        Ok(value)
    }

    /// Load configuration from the given files in order; missing files are
    /// skipped, and each present file overrides only the keys it sets.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())
            .map_err(|e| AgentError::Config(e.to_string()))?;

        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                continue;
            }
            let document = Self::read_document(path)?;
            if let (Some(target), Some(source)) = (merged.as_object_mut(), document.as_object()) {
                for (key, value) in source {
                    target.insert(key.clone(), value.clone());
                }
            }
            tracing::info!("Read config: {}", path.display());
        }

        serde_json::from_value(merged).map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Load configuration with discovery.
    ///
    /// An explicit path must exist and parse. Without one, the default
    /// locations are merged in order; none existing yields the defaults.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> Result<Self> {
        let mut config = match cli_path {
            Some(path) => {
                tracing::info!("Loading configuration from explicit path: {:?}", path);
                if !path.exists() {
                    return Err(AgentError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_files(&[path])?
            }
            None => {
                let paths: Vec<PathBuf> = DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).collect();
                if !paths.iter().any(|p| p.exists()) {
                    tracing::warn!("No configuration file found in standard locations. Using defaults.");
                }
                Self::from_files(&paths)?
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ORCHESTRATOR_AGENT_AGENTS_SERVER") {
            tracing::info!("Environment override: ORCHESTRATOR_AGENT_AGENTS_SERVER={}", val);
            self.agents_server = val;
        }

        if let Ok(val) = std::env::var("ORCHESTRATOR_AGENT_EXEC_WITH_SUDO") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: ORCHESTRATOR_AGENT_EXEC_WITH_SUDO=true");
                    self.exec_with_sudo = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: ORCHESTRATOR_AGENT_EXEC_WITH_SUDO=false");
                    self.exec_with_sudo = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for ORCHESTRATOR_AGENT_EXEC_WITH_SUDO: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.agents_server.is_empty() {
            return Err(AgentError::Config(
                "AgentsServer unconfigured. Please set to the HTTP address orchestrator serves agents (port is by default 3001)".to_string(),
            ));
        }

        if self.continuous_poll_seconds == 0 {
            return Err(AgentError::Config("ContinuousPollSeconds must be positive".to_string()));
        }

        if self.resubmit_agent_interval_minutes == 0 {
            return Err(AgentError::Config(
                "ResubmitAgentIntervalMinutes must be positive".to_string(),
            ));
        }

        if !self.status_endpoint.starts_with('/') {
            return Err(AgentError::Config(format!(
                "StatusEndpoint must start with '/': '{}'",
                self.status_endpoint
            )));
        }

        if self
            .status_endpoint
            .contains(|c| matches!(c, '{' | '}' | ':' | '*'))
        {
            return Err(AgentError::Config(format!(
                "StatusEndpoint must be a literal path: '{}'",
                self.status_endpoint
            )));
        }

        let endpoint = self.status_endpoint.trim_end_matches('/');
        let reserved = RESERVED_API_PATHS.iter().find(|path| {
            endpoint == **path
                || endpoint
                    .strip_prefix(**path)
                    .is_some_and(|rest| rest.starts_with('/'))
        });
        if let Some(path) = reserved {
            return Err(AgentError::Config(format!(
                "StatusEndpoint '{}' collides with API route {}",
                self.status_endpoint, path
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AgentConfig::default();
        assert_eq!(config.continuous_poll_seconds, 60);
        assert_eq!(config.resubmit_interval(), Duration::from_secs(3600));
        assert_eq!(config.mysql_client_command, "mysql");
        assert_eq!(config.mysql_binlog_command, "mysqlbinlog");
        assert_eq!(config.http_port, 3002);
        assert_eq!(config.status_endpoint, "/api/status");
        assert_eq!(config.status_bad_seconds, 300);
        assert!(!config.exec_with_sudo);
    }

    #[test]
    fn test_original_key_names_parse() {
        let config: AgentConfig = serde_json::from_str(
            r#"{
                "AgentsServer": "http://orchestrator.local",
                "AgentsServerPort": ":3001",
                "HTTPPort": 3003,
                "ExecWithSudo": true,
                "MySQLDatadirCommand": "echo /var/lib/mysql",
                "CustomCommands": {"uptime": "uptime"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.agents_base_url(), "http://orchestrator.local:3001");
        assert_eq!(config.http_port, 3003);
        assert!(config.exec_with_sudo);
        assert_eq!(config.mysql_datadir_command, "echo /var/lib/mysql");
        assert_eq!(config.custom_commands.get("uptime").map(String::as_str), Some("uptime"));
        assert_eq!(config.continuous_poll_seconds, 60);
    }

    #[test]
    fn test_later_files_override_only_their_keys() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.conf.json");
        let second = dir.path().join("second.conf.yaml");
        let missing = dir.path().join("missing.conf.json");

        let mut f = std::fs::File::create(&first).unwrap();
        writeln!(f, r#"{{"AgentsServer": "http://a", "HTTPPort": 4000}}"#).unwrap();
        let mut f = std::fs::File::create(&second).unwrap();
        writeln!(f, "HTTPPort: 4001").unwrap();

        let config = AgentConfig::from_files(&[first, missing, second]).unwrap();
        assert_eq!(config.agents_server, "http://a");
        assert_eq!(config.http_port, 4001);
    }

    #[test]
    fn test_invalid_document_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.conf.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AgentConfig::from_files(&[path]),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let result = AgentConfig::load_or_default(Some(PathBuf::from("/nonexistent/agent.conf.json")));
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_validation() {
        let mut config = AgentConfig::default();

        // AgentsServer is required
        assert!(config.validate().is_err());
        config.agents_server = "http://orchestrator".to_string();
        assert!(config.validate().is_ok());

        config.continuous_poll_seconds = 0;
        assert!(config.validate().is_err());
        config.continuous_poll_seconds = 60;

        config.status_endpoint = "api/status".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_status_endpoint_may_not_shadow_api_routes() {
        let mut config = AgentConfig {
            agents_server: "http://orchestrator".to_string(),
            ..Default::default()
        };

        for endpoint in ["/api/hostname", "/api/hostname/", "/api/lvs/extra", "/api/custom-commands/x"] {
            config.status_endpoint = endpoint.to_string();
            assert!(
                matches!(config.validate(), Err(AgentError::Config(_))),
                "{} should be rejected",
                endpoint
            );
        }

        for endpoint in ["/health/{id}", "/health/:id", "/health/*rest"] {
            config.status_endpoint = endpoint.to_string();
            assert!(config.validate().is_err(), "{} should be rejected", endpoint);
        }

        for endpoint in ["/api/status", "/health", "/api/lvs2", "/"] {
            config.status_endpoint = endpoint.to_string();
            assert!(config.validate().is_ok(), "{} should be accepted", endpoint);
        }
    }
}
