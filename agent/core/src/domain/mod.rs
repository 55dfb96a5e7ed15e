// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Value types, configuration and outbound contracts of the agent. Nothing
//! here spawns processes or performs I/O beyond reading config files.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Binlog coordinates and segment planning, LVM/mount
//!   descriptions, seed transfer templates, process token, error taxonomy

pub mod agent_config;
pub mod binlog;
pub mod error;
pub mod orchestrator;
pub mod seed;
pub mod token;
pub mod volume;
