// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Process Identity Token
//!
//! A per-process secret announced to the orchestrator on submit and required
//! on every privileged API call. Regenerated on every restart; never persisted
//! except through the optional token hint file.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

#[derive(Clone, PartialEq, Eq)]
pub struct ProcessToken(String);

impl ProcessToken {
    /// Hex SHA-256 of a fresh v4 UUID and the current timestamp.
    pub fn generate() -> Self {
        let mut hasher = Sha256::new();
        hasher.update(Uuid::new_v4().as_bytes());
        hasher.update(Utc::now().to_rfc3339().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl fmt::Display for ProcessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Keep the secret out of `{:?}` output.
impl fmt::Debug for ProcessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProcessToken(..)")
    }
}
