// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Message bus application service.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Mailboxes, history and collaboration sessions for A2A traffic

pub mod message_bus;

pub use message_bus::{AgentActivity, MessageBus, MessageFilter, MessageObserver, MessageStatistics};
