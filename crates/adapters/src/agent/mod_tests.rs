use super::*;

#[tokio::test]
async fn fake_adapter_assigns_a_session_id_on_start() {
    let agent = FakeAgentAdapter::new("claude");
    let result = agent
        .start_new_conversation("hello", "system", None)
        .await
        .unwrap();
    assert_eq!(result.output, "ok");
    assert!(!result.session_id.is_empty());
}

#[tokio::test]
async fn fake_adapter_preserves_session_id_on_continue() {
    let agent = FakeAgentAdapter::new("claude");
    let result = agent
        .continue_conversation("sess-1", "more", None)
        .await
        .unwrap();
    assert_eq!(result.session_id, "sess-1");
}

#[tokio::test]
async fn fake_adapter_records_calls() {
    let agent = FakeAgentAdapter::new("claude");
    agent.fetch_and_refresh_tokens().await.unwrap();
    agent
        .start_new_conversation("hi", "sys", None)
        .await
        .unwrap();
    assert_eq!(agent.calls().len(), 2);
}

#[tokio::test]
async fn fake_adapter_returns_scripted_error() {
    let agent = FakeAgentAdapter::new("claude");
    agent.set_start_error(AgentAdapterError::InvocationFailed("boom".into()));
    let result = agent.start_new_conversation("hi", "sys", None).await;
    assert!(matches!(result, Err(AgentAdapterError::InvocationFailed(_))));
}
