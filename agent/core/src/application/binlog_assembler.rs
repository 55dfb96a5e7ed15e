// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Binlog Assembler Application Service
//!
//! Extracts byte ranges or decoded text from MySQL binary / relay logs for
//! shipping to another host, and applies shipped relay log contents locally.
//!
//! Payloads travel as base64 (standard alphabet, no line wrapping) of gzip
//! data. Compression and encoding happen in-process; only the log-reader tool
//! and the byte-range copies shell out.
//!
//! A binary extraction concatenates several log files into one parseable log:
//! only the first file's header (4-byte magic + format description event)
//! survives, every later file is cut past its own header. Header sizes vary by
//! server version and are always measured, never assumed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use std::io::{Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::domain::agent_config::AgentConfig;
use crate::domain::binlog::{needs_header_size, plan_binary_segments};
use crate::domain::error::{AgentError, Result};
use crate::infrastructure::command_runner::CommandRunner;

const BINARY_SCRATCH_PREFIX: &str = "orchestrator-agent-binlog-contents-";
const APPLY_SCRATCH_PREFIX: &str = "orchestrator-agent-apply-relaylog-bin-";

/// gzip then base64 `bytes`.
pub fn encode_payload(bytes: &[u8]) -> Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

/// Reverse [`encode_payload`]. ASCII whitespace (line wrapping from other
/// encoders, trailing newlines) is ignored.
pub fn decode_payload(encoded: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = encoded
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let compressed = STANDARD
        .decode(&compact)
        .map_err(|e| AgentError::Decode(format!("base64: {}", e)))?;
    let mut decoded = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut decoded)
        .map_err(|e| AgentError::Decode(format!("gzip: {}", e)))?;
    Ok(decoded)
}

/// First `end_log_pos N` reported by the log reader.
pub fn parse_header_size(output: &[u8]) -> Result<u64> {
    let re = Regex::new(r"end_log_pos (\d+)").map_err(|e| AgentError::Parse(e.to_string()))?;
    let text = String::from_utf8_lossy(output);
    let caps = re
        .captures(&text)
        .ok_or_else(|| AgentError::Parse("no end_log_pos in log reader output".to_string()))?;
    caps[1]
        .parse()
        .map_err(|_| AgentError::Parse(format!("invalid end_log_pos: {}", &caps[1])))
}

#[derive(Debug, Clone)]
pub struct BinlogAssembler {
    runner: CommandRunner,
    binlog_command: String,
    client_command: String,
    scratch_dir: PathBuf,
}

impl BinlogAssembler {
    pub fn new(
        runner: CommandRunner,
        binlog_command: impl Into<String>,
        client_command: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            binlog_command: binlog_command.into(),
            client_command: client_command.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Create scratch files under `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn from_config(runner: CommandRunner, config: &AgentConfig) -> Self {
        Self::new(
            runner,
            config.mysql_binlog_command.clone(),
            config.mysql_client_command.clone(),
        )
    }

    /// Decoded text of `files` through the log reader, encoded for transport.
    pub async fn render_text(
        &self,
        files: &[String],
        start: Option<u64>,
        stop: Option<u64>,
    ) -> Result<String> {
        if files.is_empty() {
            return Err(AgentError::NoFiles);
        }
        let mut cmd = format!("{} {}", self.binlog_command, files.join(" "));
        if let Some(start) = start {
            cmd = format!("{} --start-position={}", cmd, start);
        }
        if let Some(stop) = stop {
            cmd = format!("{} --stop-position={}", cmd, stop);
        }
        let output = self.runner.run_capture(&cmd).await?;
        encode_payload(&output)
    }

    /// Offset where the format description event of `file` ends.
    pub async fn header_size(&self, file: &str) -> Result<u64> {
        let cmd = format!("{} {} --start-position=4 | head", self.binlog_command, file);
        let output = self.runner.run_capture(&self.runner.elevate(&cmd)).await?;
        let size = parse_header_size(&output)?;
        debug!("Header size of {}: {}", file, size);
        Ok(size)
    }

    /// Raw bytes of `files` from `start` in the first to `stop` in the last,
    /// concatenated as one log and encoded for transport.
    pub async fn render_binary(
        &self,
        files: &[String],
        start: Option<u64>,
        stop: Option<u64>,
    ) -> Result<String> {
        if files.is_empty() {
            return Err(AgentError::NoFiles);
        }

        let mut header_sizes = vec![0; files.len()];
        for (index, file) in files.iter().enumerate() {
            if needs_header_size(index, start) {
                header_sizes[index] = self.header_size(file).await?;
            }
        }

        let scratch = tempfile::Builder::new()
            .prefix(BINARY_SCRATCH_PREFIX)
            .tempfile_in(&self.scratch_dir)?;
        for segment in plan_binary_segments(files, start, stop, &header_sizes) {
            let cmd = segment.copy_command(scratch.path());
            self.runner.run_capture(&self.runner.elevate(&cmd)).await?;
        }

        let contents = tokio::fs::read(scratch.path()).await?;
        encode_payload(&contents)
    }

    /// Decode shipped relay log contents and pipe them through the log reader
    /// into the MySQL client. With no client configured the contents are only
    /// decoded.
    pub async fn apply(&self, encoded: &[u8]) -> Result<()> {
        let decoded = decode_payload(encoded)?;
        let mut scratch: NamedTempFile = tempfile::Builder::new()
            .prefix(APPLY_SCRATCH_PREFIX)
            .tempfile_in(&self.scratch_dir)?;
        scratch.write_all(&decoded)?;
        scratch.flush()?;

        if !self.client_command.is_empty() {
            let cmd = format!(
                "{} {} | {}",
                self.binlog_command,
                scratch.path().display(),
                self.client_command
            );
            self.runner.run_capture(&self.runner.elevate(&cmd)).await?;
        }
        info!(
            "Applied relay log contents ({} bytes) from {}",
            decoded.len(),
            scratch.path().display()
        );
        Ok(())
    }
}
