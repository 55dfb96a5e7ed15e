// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::path::Path;
use tracing::debug;

use super::HostOperations;
use crate::domain::error::{AgentError, Result};
use crate::domain::volume::MountInfo;
use crate::infrastructure::command_runner::output_tokens;

const HEURISTIC_FILE_NAME: &str = "ibdata1";

/// Find the mount table entry for `mount_point`: `(device, path, fstype)`.
pub fn parse_mount_entry(table: &str, mount_point: &str) -> Option<(String, String, String)> {
    table.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let device = fields.next()?;
        let path = fields.next()?;
        let fs_type = fields.next()?;
        (path == mount_point).then(|| (device.to_string(), path.to_string(), fs_type.to_string()))
    })
}

/// Candidate data directory suffixes, dropping one leading path component at
/// a time: `/var/lib/mysql`, `/lib/mysql`, `/mysql`, then the mount root.
pub fn heuristic_datadir_candidates(datadir: &str) -> Vec<String> {
    let mut candidates = vec![datadir.to_string()];
    let mut current = datadir.trim_start_matches('/');
    while !current.is_empty() {
        current = match current.split_once('/') {
            Some((_, rest)) => rest,
            None => "",
        };
        candidates.push(if current.is_empty() {
            String::new()
        } else {
            format!("/{}", current)
        });
    }
    candidates
}

fn join_under(mount_point: &str, suffix: &str) -> String {
    let joined = Path::new(mount_point).join(suffix.trim_start_matches('/'));
    joined
        .to_string_lossy()
        .trim_end_matches('/')
        .to_string()
}

impl HostOperations {
    /// Describe `mount_point`. Not being mounted is a normal result; the LV
    /// path and usage fields are filled best-effort and stay zeroed when their
    /// lookup fails.
    pub async fn get_mount(&self, mount_point: &str) -> Result<MountInfo> {
        let table = match tokio::fs::read_to_string(&self.mount_table).await {
            Ok(table) => table,
            Err(e) => {
                debug!("Cannot read mount table {}: {}", self.mount_table.display(), e);
                return Ok(MountInfo::unmounted(mount_point));
            }
        };

        let Some((device, path, filesystem)) = parse_mount_entry(&table, mount_point) else {
            return Ok(MountInfo::unmounted(mount_point));
        };

        let mut mount = MountInfo {
            path,
            device,
            filesystem,
            is_mounted: true,
            ..Default::default()
        };
        mount.volume_path = self
            .logical_volume_path(&mount.device)
            .await
            .unwrap_or_default();
        mount.disk_usage_bytes = self.disk_usage(mount_point).await.unwrap_or_default();
        mount.mysql_data_path = self
            .heuristic_mysql_data_path(mount_point)
            .await
            .unwrap_or_default();
        if !mount.mysql_data_path.is_empty() {
            mount.mysql_data_usage_bytes = self
                .disk_usage(&mount.mysql_data_path)
                .await
                .unwrap_or_default();
        }
        Ok(mount)
    }

    /// Bytes used under `path` (`du -sb`).
    pub async fn disk_usage(&self, path: &str) -> Result<u64> {
        let cmd = format!("du -sb {}", path);
        let output = self.runner.run_capture(&self.runner.elevate(&cmd)).await?;
        let tokens = output_tokens(&output);
        let first = tokens
            .first()
            .and_then(|line| line.first())
            .ok_or_else(|| AgentError::Parse(format!("no output from: {}", cmd)))?;
        first
            .parse()
            .map_err(|_| AgentError::Parse(format!("unexpected du output: {}", first)))
    }

    /// Locate a MySQL data directory on a mounted snapshot by looking for
    /// `ibdata1` under progressively shorter suffixes of the local datadir.
    pub async fn heuristic_mysql_data_path(&self, mount_point: &str) -> Result<String> {
        let datadir = self.mysql_datadir().await?;
        for candidate in heuristic_datadir_candidates(&datadir) {
            let directory = join_under(mount_point, &candidate);
            let marker = Path::new(&directory).join(HEURISTIC_FILE_NAME);
            debug!("search for {}", marker.display());
            if tokio::fs::try_exists(&marker).await.unwrap_or(false) {
                return Ok(directory);
            }
        }
        Err(AgentError::NotFound("Cannot detect MySQL datadir".to_string()))
    }
}
