// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Triage orchestrator core.
//!
//! # Architecture
//!
//! - **domain**: incident aggregate, executions, MCP context, events, config
//! - **application**: the workflow engine and dashboard queries
//! - **infrastructure**: event bus, context store, incident registry and the
//!   standard pipeline agents
//!
//! Agent-to-agent messaging lives in the `triage_swarm` crate and is
//! re-exported here as [`swarm`].

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
pub use triage_swarm as swarm;
