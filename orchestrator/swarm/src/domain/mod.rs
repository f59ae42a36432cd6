// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # A2A Domain Layer
//!
//! Pure domain types for agent-to-agent messaging. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`agent`] | `AgentId` |
//! | [`message`] | `A2AMessage`, `MessageType`, `MessagePriority` |
//! | [`collaboration`] | `Collaboration`, `CollaborationId`, `CollaborationStatus` |
//! | [`error`] | `A2AError` |

pub mod agent;
pub mod message;
pub mod collaboration;
pub mod error;

pub use agent::*;
pub use message::*;
pub use collaboration::*;
pub use error::*;
