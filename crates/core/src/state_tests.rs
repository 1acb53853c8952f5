use super::*;
use crate::job::{JobId, JobMode, JobStatus};

#[test]
fn fresh_state_is_empty() {
    let state = PersistedState::fresh("agent-1");
    assert_eq!(state.agent_id, "agent-1");
    assert!(state.jobs.is_empty());
    assert!(state.queued_messages.is_empty());
}

#[test]
fn persisted_state_serde_roundtrip() {
    let mut state = PersistedState::fresh("agent-1");
    let rec = JobRecord::new(JobId::new("j1"), JobMode::Execute, 10);
    state.jobs.insert("j1".into(), rec);
    let json = serde_json::to_string(&state).unwrap();
    let parsed: PersistedState = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, state);
    assert_eq!(parsed.jobs["j1"].status, JobStatus::InProgress);
}
