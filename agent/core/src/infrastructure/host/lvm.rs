// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use regex::Regex;
use tracing::info;

use super::HostOperations;
use crate::domain::error::{AgentError, Result};
use crate::domain::volume::{LogicalVolume, MountInfo};
use crate::infrastructure::command_runner::{output_lines, output_tokens};

/// Parse `lvs --noheading -o lv_name,vg_name,lv_path,snap_percent` rows,
/// keeping volumes whose name contains `filter`.
///
/// Regular volumes leave the percent column empty; a missing or unparseable
/// percent marks the volume as not a snapshot.
pub fn parse_logical_volumes(output: &[u8], filter: &str) -> Vec<LogicalVolume> {
    output_tokens(output)
        .into_iter()
        .filter(|tokens| tokens.len() >= 3)
        .filter_map(|tokens| {
            let percent = tokens.get(3).and_then(|p| p.parse::<f64>().ok());
            let volume = LogicalVolume {
                name: tokens[0].clone(),
                group_name: tokens[1].clone(),
                path: tokens[2].clone(),
                is_snapshot: percent.is_some(),
                snapshot_percent: percent.unwrap_or_default(),
            };
            volume.name.contains(filter).then_some(volume)
        })
        .collect()
}

/// Extract `TYPE="..."` from `blkid` output.
pub fn parse_fs_type(output: &[u8]) -> Result<Option<String>> {
    let re = Regex::new(r#"TYPE="(.*?)""#).map_err(|e| AgentError::Parse(e.to_string()))?;
    Ok(output_lines(output).iter().find_map(|line| {
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }))
}

impl HostOperations {
    pub async fn logical_volumes(&self, volume: &str, filter: &str) -> Result<Vec<LogicalVolume>> {
        let cmd = format!(
            "lvs --noheading -o lv_name,vg_name,lv_path,snap_percent {}",
            volume
        );
        let output = self.runner.run_capture(&self.runner.elevate(&cmd)).await?;
        Ok(parse_logical_volumes(&output, filter))
    }

    pub async fn logical_volume_path(&self, volume: &str) -> Result<String> {
        self.logical_volumes(volume, "")
            .await?
            .into_iter()
            .next()
            .map(|lv| lv.path)
            .ok_or_else(|| AgentError::NotFound(format!("logical volume not found: {}", volume)))
    }

    pub async fn logical_volume_fs_type(&self, volume: &str) -> Result<String> {
        let output = self
            .runner
            .run_capture(&self.runner.elevate(&format!("blkid {}", volume)))
            .await?;
        parse_fs_type(&output)?.ok_or_else(|| {
            AgentError::NotFound(format!("Cannot find FS type for logical volume {}", volume))
        })
    }

    /// Mount `volume` on `mount_point` and report the resulting mount.
    pub async fn mount_lv(&self, mount_point: &str, volume: &str) -> Result<MountInfo> {
        if volume.is_empty() {
            return Err(AgentError::Refused("empty volume name in mount".to_string()));
        }
        let fs_type = self.logical_volume_fs_type(volume).await?;
        // xfs refuses to mount a snapshot carrying its origin's UUID
        let options = if fs_type == "xfs" { "-o nouuid " } else { "" };
        let cmd = format!("mount {}{} {}", options, volume, mount_point);
        self.runner.run_capture(&self.runner.elevate(&cmd)).await?;
        info!("Mounted {} on {}", volume, mount_point);
        self.get_mount(mount_point).await
    }

    pub async fn unmount(&self, mount_point: &str) -> Result<MountInfo> {
        let cmd = format!("umount {}", mount_point);
        self.runner.run_capture(&self.runner.elevate(&cmd)).await?;
        info!("Unmounted {}", mount_point);
        self.get_mount(mount_point).await
    }

    pub async fn remove_lv(&self, volume: &str) -> Result<()> {
        let cmd = format!("lvremove --force {}", volume);
        self.runner.run_capture(&self.runner.elevate(&cmd)).await?;
        info!("Removed logical volume {}", volume);
        Ok(())
    }

    pub async fn create_snapshot(&self) -> Result<()> {
        self.runner
            .run_capture(&self.config.create_snapshot_command)
            .await?;
        Ok(())
    }

    /// Hosts with available snapshots, one per line of the configured command.
    pub async fn available_snapshots(&self, require_local: bool) -> Result<Vec<String>> {
        let cmd = if require_local {
            &self.config.available_local_snapshot_hosts_command
        } else {
            &self.config.available_snapshot_hosts_command
        };
        let output = self.runner.run_capture(cmd).await?;
        Ok(output_lines(&output))
    }
}
