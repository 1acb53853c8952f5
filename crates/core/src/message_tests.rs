use super::*;

#[test]
fn inbound_start_conversation_roundtrip() {
    let msg = InboundMessage::StartConversation {
        id: "m1".into(),
        payload: ConversationPayload {
            job_id: JobId::new("j1"),
            message: "hi".into(),
            processed_message_id: "p1".into(),
            message_link: "https://chat/thread/1".into(),
            thread_history: vec!["earlier".into()],
            attachments: vec![],
        },
    };
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("start_conversation_v1"));
    let parsed: InboundMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, msg);
    assert_eq!(parsed.id(), "m1");
    assert_eq!(parsed.processed_message_id(), "p1");
    assert_eq!(parsed.job_id(), Some(&JobId::new("j1")));
}

#[test]
fn unknown_type_fails_to_parse_and_is_dropped_by_caller() {
    let json = r#"{"type":"something_else_v1","id":"m1"}"#;
    let result: Result<InboundMessage, _> = serde_json::from_str(json);
    assert!(result.is_err());
}

#[test]
fn jobless_messages_have_no_job_id_or_processed_message_id() {
    let msg = InboundMessage::CheckIdleJobs {
        id: "m2".into(),
        payload: EmptyPayload {},
    };
    assert_eq!(msg.job_id(), None);
    assert_eq!(msg.processed_message_id(), "");
}

#[test]
fn outbound_job_complete_roundtrip() {
    let msg = OutboundMessage::JobComplete {
        job_id: JobId::new("j1"),
        reason: "Thread is inactive".into(),
    };
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("job_complete_v1"));
    let parsed: OutboundMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, msg);
    assert_eq!(parsed.job_id(), &JobId::new("j1"));
}
