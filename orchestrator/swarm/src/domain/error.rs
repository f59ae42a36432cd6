// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::collaboration::CollaborationId;

/// Errors raised by the A2A message bus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum A2AError {
    #[error("Collaboration not found: {0}")]
    CollaborationNotFound(CollaborationId),

    #[error("Collaboration {0} is closed")]
    CollaborationClosed(CollaborationId),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}
