// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `triage-swarm`: Agent-to-Agent Coordination Crate
//!
//! Owns the A2A protocol used by pipeline agents while an incident is being
//! worked: per-agent mailboxes, the append-only message history, capability
//! discovery and ad-hoc collaboration sessions.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `AgentId`, `A2AMessage`, `Collaboration`, `A2AError` |
//! | [`application`] | Application | `MessageBus` service and its observer hook |
//!
//! ## Key Concepts
//!
//! - **Mailbox**: FIFO queue per receiving agent, drained atomically. Each
//!   message is handed out at most once.
//! - **Collaboration**: a task shared by an initiator and a set of
//!   participants. Opening one sends exactly one `collaboration_request` to
//!   every participant other than the initiator.
//!
//! The crate has no dependency on the orchestrator core; the core wires a
//! [`MessageBus`] into its workflow engine.

pub mod domain;
pub mod application;

pub use domain::*;
pub use application::{MessageBus, MessageFilter, MessageObserver, MessageStatistics, AgentActivity};
