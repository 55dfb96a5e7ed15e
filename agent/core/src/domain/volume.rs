// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! LVM and mount point descriptions reported to the orchestrator.
//!
//! JSON field names follow the orchestrator's expectations (`Name`, `LVPath`,
//! `MySQLDiskUsage`, ...), hence the explicit renames.

use serde::{Deserialize, Serialize};

/// One row of LVM listing output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalVolume {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "GroupName")]
    pub group_name: String,
    #[serde(rename = "Path")]
    pub path: String,
    /// True iff a snapshot percentage was present and parseable.
    #[serde(rename = "IsSnapshot")]
    pub is_snapshot: bool,
    #[serde(rename = "SnapshotPercent")]
    pub snapshot_percent: f64,
}

impl LogicalVolume {
    /// A snapshot whose backing store is 100% consumed is invalid.
    pub fn is_snapshot_valid(&self) -> bool {
        self.is_snapshot && self.snapshot_percent < 100.0
    }
}

/// State of a mount point, enriched with LVM and MySQL data directory details.
///
/// When not mounted every derived field stays at its zero value; this is a
/// normal state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountInfo {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Device")]
    pub device: String,
    #[serde(rename = "LVPath")]
    pub volume_path: String,
    #[serde(rename = "FileSystem")]
    pub filesystem: String,
    #[serde(rename = "IsMounted")]
    pub is_mounted: bool,
    #[serde(rename = "DiskUsage")]
    pub disk_usage_bytes: u64,
    #[serde(rename = "MySQLDataPath")]
    pub mysql_data_path: String,
    #[serde(rename = "MySQLDiskUsage")]
    pub mysql_data_usage_bytes: u64,
}

impl MountInfo {
    pub fn unmounted(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(is_snapshot: bool, snapshot_percent: f64) -> LogicalVolume {
        LogicalVolume {
            name: "mysql_snap".to_string(),
            group_name: "vg0".to_string(),
            path: "/dev/vg0/mysql_snap".to_string(),
            is_snapshot,
            snapshot_percent,
        }
    }

    #[test]
    fn test_non_snapshot_is_never_valid() {
        assert!(!volume(false, 0.0).is_snapshot_valid());
        assert!(!volume(false, 50.0).is_snapshot_valid());
    }

    #[test]
    fn test_snapshot_validity_by_percent() {
        assert!(volume(true, 0.0).is_snapshot_valid());
        assert!(volume(true, 99.99).is_snapshot_valid());
        assert!(!volume(true, 100.0).is_snapshot_valid());
        assert!(!volume(true, 143.5).is_snapshot_valid());
    }

    #[test]
    fn test_unmounted_has_zero_fields() {
        let mount = MountInfo::unmounted("/mnt/snapshot");
        assert_eq!(mount.path, "/mnt/snapshot");
        assert!(!mount.is_mounted);
        assert_eq!(mount.disk_usage_bytes, 0);
        assert!(mount.mysql_data_path.is_empty());
    }
}
