// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod command_runner;
pub mod host;
pub mod orchestrator_client;
pub mod process_registry;

pub use command_runner::{CommandRunner, ProcessHandle, RunningCommand};
pub use host::HostOperations;
pub use orchestrator_client::HttpOrchestratorClient;
pub use process_registry::ProcessRegistry;
