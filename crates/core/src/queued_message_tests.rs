use super::*;

fn sample(queued_at_ms: u64) -> QueuedMessage {
    QueuedMessage {
        processed_message_id: "p1".into(),
        job_id: JobId::new("j1"),
        message_type: QueuedMessageType::UserMessage,
        message: "hi".into(),
        message_link: String::new(),
        queued_at_ms,
    }
}

#[test]
fn is_stale_respects_threshold() {
    let msg = sample(0);
    assert!(!msg.is_stale(1_000, 1_000));
    assert!(msg.is_stale(1_001, 1_000));
}

#[test]
fn serde_roundtrip() {
    let msg = sample(5);
    let json = serde_json::to_string(&msg).unwrap();
    let parsed: QueuedMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, msg);
}
