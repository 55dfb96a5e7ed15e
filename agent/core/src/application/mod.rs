// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod binlog_assembler;
pub mod heartbeat;
pub mod seed_transfer;

pub use binlog_assembler::BinlogAssembler;
pub use heartbeat::{AgentHeartbeat, HeartbeatStatus};
pub use seed_transfer::SeedTransferCoordinator;
