// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Orchestrator Agent Core
//!
//! Host-side agent for a MySQL replication orchestrator: LVM snapshot and
//! mount management, MySQL service control, binary / relay log extraction
//! and apply, seed data transfer, and the heartbeat towards the orchestrator.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain types, shell-backed infrastructure, application
//!   services and the axum HTTP API consumed by the `orchestrator-agent` binary

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
