// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod dashboard;
pub mod workflow_engine;

pub use dashboard::{AgentStats, DashboardService, DashboardStats};
pub use workflow_engine::WorkflowEngine;
