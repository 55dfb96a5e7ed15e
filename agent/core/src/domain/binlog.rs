// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Binary log value types
//!
//! Coordinates within MySQL binary / relay logs, plus the pure planning logic
//! used to cut a byte range spanning several concatenated log files.
//!
//! # Position bounds
//!
//! Callers historically send `0` to mean "no bound". Internally a bound is an
//! `Option<u64>`; [`position_bound`] performs the conversion at the edge so the
//! wire format stays unchanged while the assembler never sees a magic zero.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Which kind of log a coordinate points into.
///
/// Serialized as an integer (`0` binlog, `1` relay log) to match the
/// orchestrator's representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinlogKind {
    Binlog,
    RelayLog,
}

impl Serialize for BinlogKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            BinlogKind::Binlog => 0,
            BinlogKind::RelayLog => 1,
        })
    }
}

impl<'de> Deserialize<'de> for BinlogKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(BinlogKind::Binlog),
            1 => Ok(BinlogKind::RelayLog),
            other => Err(serde::de::Error::custom(format!(
                "unknown binlog type {}",
                other
            ))),
        }
    }
}

/// A position within a named log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinlogCoordinates {
    #[serde(rename = "LogFile")]
    pub log_file: String,
    #[serde(rename = "LogPos")]
    pub log_pos: u64,
    #[serde(rename = "Type")]
    pub kind: BinlogKind,
}

impl BinlogCoordinates {
    pub fn new(log_file: impl Into<String>, log_pos: u64, kind: BinlogKind) -> Self {
        Self {
            log_file: log_file.into(),
            log_pos,
            kind,
        }
    }
}

/// Convert a raw wire position into a bound: `0` means unspecified.
pub fn position_bound(raw: u64) -> Option<u64> {
    (raw != 0).then_some(raw)
}

/// Return the suffix of `files` starting at the first entry matching `name`,
/// either by full path or by base name. Empty when nothing matches.
pub fn select_files_from_name(files: &[String], name: &str) -> Vec<String> {
    files
        .iter()
        .position(|file| {
            file == name
                || Path::new(file)
                    .file_name()
                    .map(|base| base == name)
                    .unwrap_or(false)
        })
        .map(|index| files[index..].to_vec())
        .unwrap_or_default()
}

/// A byte range `[skip, limit)` of one log file, appended to the scratch blob.
/// A `limit` of `None` runs to the end of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySegment {
    pub file: String,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl BinarySegment {
    /// Shell pipeline that appends this segment to `target`.
    pub fn copy_command(&self, target: &Path) -> String {
        let mut cmd = format!("cat {}", self.file);
        if let Some(limit) = self.limit {
            cmd = format!("{} | head -c {}", cmd, limit);
        }
        if self.skip > 0 {
            cmd = format!("{} | tail -c +{}", cmd, self.skip + 1);
        }
        format!("{} >> {}", cmd, target.display())
    }
}

/// Whether file `index` needs its header size measured for a binary extraction.
pub fn needs_header_size(index: usize, start: Option<u64>) -> bool {
    index > 0 || start.is_some()
}

/// Plan the segments of a binary extraction.
///
/// `header_sizes[i]` must hold the measured header size of `files[i]` wherever
/// [`needs_header_size`] is true; other entries are ignored.
///
/// - With a start bound, the first file's header (magic + format description)
///   is emitted first so the blob stays parseable, followed by the first file
///   from `start` onwards.
/// - Every later file drops its own header so only one survives.
/// - The last file is truncated at `stop` when given.
pub fn plan_binary_segments(
    files: &[String],
    start: Option<u64>,
    stop: Option<u64>,
    header_sizes: &[u64],
) -> Vec<BinarySegment> {
    let mut segments = Vec::with_capacity(files.len() + 1);
    let last = files.len().saturating_sub(1);

    if let (Some(first), Some(_)) = (files.first(), start) {
        segments.push(BinarySegment {
            file: first.clone(),
            skip: 0,
            limit: Some(header_sizes.first().copied().unwrap_or_default()),
        });
    }

    for (index, file) in files.iter().enumerate() {
        let skip = match (index, start) {
            (0, Some(start)) => start,
            (0, None) => 0,
            _ => header_sizes.get(index).copied().unwrap_or_default(),
        };
        let limit = if index == last { stop } else { None };
        segments.push(BinarySegment {
            file: file.clone(),
            skip,
            limit,
        });
    }

    segments
}
