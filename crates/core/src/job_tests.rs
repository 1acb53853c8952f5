use super::*;

#[test]
fn new_job_record_starts_in_progress() {
    let rec = JobRecord::new(JobId::new("j1"), JobMode::Execute, 1_000);
    assert_eq!(rec.status, JobStatus::InProgress);
    assert!(!rec.has_worktree());
    assert!(!rec.has_session());
    assert!(!rec.has_pull_request());
}

#[test]
fn is_stale_respects_threshold() {
    let rec = JobRecord::new(JobId::new("j1"), JobMode::Execute, 0);
    assert!(!rec.is_stale(JOB_STALENESS_THRESHOLD_MS, JOB_STALENESS_THRESHOLD_MS));
    assert!(rec.is_stale(JOB_STALENESS_THRESHOLD_MS + 1, JOB_STALENESS_THRESHOLD_MS));
}

#[test]
fn job_status_is_terminal() {
    assert!(!JobStatus::InProgress.is_terminal());
    assert!(JobStatus::Completed.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
}

#[test]
fn job_mode_defaults_to_execute() {
    assert_eq!(JobMode::default(), JobMode::Execute);
}

#[test]
fn job_record_serde_roundtrip() {
    let mut rec = JobRecord::new(JobId::new("j1"), JobMode::Ask, 42);
    rec.branch_name = "feat/x".into();
    rec.cli_session_id = "sess-1".into();
    let json = serde_json::to_string(&rec).unwrap();
    let parsed: JobRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, rec);
}

#[test]
fn job_record_deserializes_with_missing_optional_fields() {
    let json = r#"{"job_id":"j1","status":"in_progress","updated_at_ms":0}"#;
    let rec: JobRecord = serde_json::from_str(json).unwrap();
    assert_eq!(rec.branch_name, "");
    assert_eq!(rec.mode, JobMode::Execute);
}

#[test]
fn job_status_display() {
    assert_eq!(JobStatus::InProgress.to_string(), "in_progress");
    assert_eq!(JobStatus::Completed.to_string(), "completed");
    assert_eq!(JobStatus::Failed.to_string(), "failed");
}
