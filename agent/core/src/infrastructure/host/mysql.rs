// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::path::Path;
use tracing::{debug, info};

use super::HostOperations;
use crate::domain::binlog::{BinlogCoordinates, BinlogKind};
use crate::domain::error::{AgentError, Result};
use crate::infrastructure::command_runner::{output_lines, output_tokens};

const ERROR_LOG_TAIL_COMMAND: &str =
    r#"tail -n 20 $(egrep "log[-_]error" /etc/my.cnf | cut -d "=" -f 2)"#;

/// Relay log file names listed in an index file, joined to the index's
/// directory.
pub fn parse_relay_log_index(index_file: &str, contents: &str) -> Vec<String> {
    let directory = Path::new(index_file).parent().unwrap_or(Path::new(""));
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|name| name.trim_start_matches("./"))
        .map(|name| directory.join(name).to_string_lossy().into_owned())
        .collect()
}

/// Integer at `column` of the first output line.
pub fn parse_first_number(output: &[u8], column: usize) -> Result<u64> {
    let tokens = output_tokens(output);
    let value = tokens
        .first()
        .and_then(|line| line.get(column))
        .ok_or_else(|| AgentError::Parse("no rows found in command output".to_string()))?;
    value
        .parse()
        .map_err(|_| AgentError::Parse(format!("not a number: {}", value)))
}

impl HostOperations {
    pub async fn mysql_datadir(&self) -> Result<String> {
        self.runner.run_text(&self.config.mysql_datadir_command).await
    }

    pub async fn mysql_port(&self) -> Result<u64> {
        let port = self.runner.run_text(&self.config.mysql_port_command).await?;
        port.parse()
            .map_err(|_| AgentError::Parse(format!("unexpected MySQL port: {}", port)))
    }

    pub async fn relay_log_index_file(&self) -> Result<String> {
        let datadir = self.mysql_datadir().await?;
        self.runner
            .run_text(&format!("ls {}/*relay*.index", datadir))
            .await
    }

    pub async fn relay_log_file_names(&self) -> Result<Vec<String>> {
        let index_file = self.relay_log_index_file().await?;
        let contents = tokio::fs::read_to_string(&index_file).await?;
        Ok(parse_relay_log_index(&index_file, &contents))
    }

    /// Coordinates at the end of the last relay log: its size in bytes.
    pub async fn relay_log_end_coordinates(&self) -> Result<BinlogCoordinates> {
        let files = self.relay_log_file_names().await?;
        let last = files
            .last()
            .ok_or_else(|| AgentError::NotFound("no relay logs listed in index".to_string()))?;
        let output = self
            .runner
            .run_capture(&self.runner.elevate(&format!("du -b {}", last)))
            .await?;
        let size = parse_first_number(&output, 0)?;
        Ok(BinlogCoordinates::new(last.clone(), size, BinlogKind::RelayLog))
    }

    /// Free bytes on the filesystem holding the MySQL datadir.
    pub async fn mysql_datadir_available_space(&self) -> Result<u64> {
        let datadir = self.mysql_datadir().await?;
        let output = self
            .runner
            .run_capture(&format!("df -PT -B 1 {} | sed -e /^Filesystem/d", datadir))
            .await?;
        parse_first_number(&output, 4)
    }

    pub async fn mysql_error_log_tail(&self) -> Result<Vec<String>> {
        let output = self
            .runner
            .run_capture(&self.runner.elevate(ERROR_LOG_TAIL_COMMAND))
            .await?;
        Ok(output_lines(&output))
    }

    /// The status command exits 0 when MySQL runs; any failure means stopped.
    pub async fn mysql_running(&self) -> bool {
        match self
            .runner
            .run_capture(&self.config.mysql_service_status_command)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!("MySQL status: {}", e);
                false
            }
        }
    }

    pub async fn mysql_stop(&self) -> Result<()> {
        self.runner
            .run_capture(&self.config.mysql_service_stop_command)
            .await?;
        info!("MySQL stopped");
        Ok(())
    }

    pub async fn mysql_start(&self) -> Result<()> {
        self.runner
            .run_capture(&self.config.mysql_service_start_command)
            .await?;
        info!("MySQL started");
        Ok(())
    }

    /// Run the configured delete command after checking the datadir is
    /// neither empty nor a filesystem root. Does not check that MySQL is down.
    pub async fn delete_mysql_datadir(&self) -> Result<()> {
        let datadir = self.mysql_datadir().await?;
        if datadir.is_empty() {
            return Err(AgentError::Refused(
                "refusing to delete empty directory".to_string(),
            ));
        }
        if Path::new(&datadir).parent().is_none() {
            return Err(AgentError::Refused(format!(
                "Directory {} seems to be root; refusing to delete",
                datadir
            )));
        }
        self.runner
            .run_capture(&self.config.mysql_delete_datadir_content_command)
            .await?;
        info!("Deleted content of MySQL datadir {}", datadir);
        Ok(())
    }

    /// Cleanup after a seed copy, before MySQL starts.
    pub async fn post_copy(&self) -> Result<()> {
        self.runner.run_capture(&self.config.post_copy_command).await?;
        Ok(())
    }

    pub async fn run_custom_command(&self, key: &str) -> Result<Vec<u8>> {
        let cmd = self
            .config
            .custom_commands
            .get(key)
            .ok_or_else(|| AgentError::NotFound(format!("custom command: {}", key)))?;
        self.runner.run_capture(cmd).await
    }
}
