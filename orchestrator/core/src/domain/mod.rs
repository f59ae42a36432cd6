// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain model for incident triage: the incident aggregate, per-stage
//! execution records, the shared analysis context, domain events and the
//! agent capability.

pub mod agent;
pub mod error;
pub mod events;
pub mod execution;
pub mod incident;
pub mod mcp;
pub mod node_config;
pub mod scenario;
