// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use triage_swarm::{
    A2AMessage, AgentId, Collaboration, CollaborationStatus, MessageBus, MessageFilter, MessageType,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn drains_partition_history_under_concurrent_senders() {
    let bus = Arc::new(MessageBus::new());
    let receiver = AgentId::from("validation");

    let mut senders = Vec::new();
    for sender in ["monitoring", "rca", "remediation", "pager"] {
        let bus = bus.clone();
        senders.push(tokio::spawn(async move {
            for i in 0..50 {
                bus.send(A2AMessage::new(
                    sender,
                    "validation",
                    MessageType::DataShare,
                    json!({ "seq": i }),
                ))
                .unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }

    let drainer = {
        let bus = bus.clone();
        let receiver = receiver.clone();
        tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..100 {
                seen.extend(bus.drain(&receiver, None));
                tokio::task::yield_now().await;
            }
            seen
        })
    };

    for handle in senders {
        handle.await.unwrap();
    }
    let mut drained = drainer.await.unwrap();
    drained.extend(bus.drain(&receiver, None));

    let ids: HashSet<_> = drained.iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), drained.len(), "a message was delivered twice");

    let history = bus.history(&MessageFilter {
        receiver: Some(receiver.clone()),
        ..Default::default()
    });
    assert_eq!(history.len(), 200);
    let history_ids: HashSet<_> = history.iter().map(|m| m.id).collect();
    assert_eq!(ids, history_ids);

    // Per-sender order is preserved across drains.
    for sender in ["monitoring", "rca"] {
        let seqs: Vec<i64> = drained
            .iter()
            .filter(|m| m.sender.as_str() == sender)
            .map(|m| m.content["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(seqs, (0..50).collect::<Vec<_>>());
    }
}

#[test]
fn collaboration_with_n_invitees_sends_n_requests() {
    let bus = MessageBus::new();
    let participants: Vec<AgentId> = ["rca", "email", "ticketing", "rca", "remediation"]
        .into_iter()
        .map(AgentId::from)
        .collect();

    let collab_id = bus
        .open_collaboration(Collaboration::open(
            AgentId::from("pager"),
            participants,
            "coordinated_stakeholder_notification",
            json!({ "severity": "critical" }),
        ))
        .unwrap();

    let requests = bus.history(&MessageFilter {
        correlation_id: Some(collab_id),
        ..Default::default()
    });
    assert_eq!(requests.len(), 4);
    assert!(requests
        .iter()
        .all(|m| m.message_type == MessageType::CollaborationRequest));
    let receivers: HashSet<_> = requests.iter().map(|m| m.receiver.as_str().to_string()).collect();
    assert_eq!(receivers.len(), 4);
    assert!(!receivers.contains("pager"));

    let active = bus.collaborations(Some(CollaborationStatus::Active));
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].task, "coordinated_stakeholder_notification");

    bus.close_collaboration(collab_id).unwrap();
    assert!(bus.collaborations(Some(CollaborationStatus::Active)).is_empty());
    assert_eq!(bus.collaborations(None).len(), 1);
}
