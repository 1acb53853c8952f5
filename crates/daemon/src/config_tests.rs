use super::*;

fn base_args() -> Vec<&'static str> {
    vec![
        "convoyd",
        "--repo-path",
        "/tmp/repo",
        "--agent-id",
        "agent-1",
        "--transport-url",
        "wss://example.invalid/ws",
        "--config-dir",
        "/tmp/config",
    ]
}

#[test]
fn parses_required_flags_with_defaults() {
    let config = Config::try_parse_from(base_args()).unwrap();
    assert_eq!(config.max_concurrency, 4);
    assert_eq!(config.pool_target_size, 2);
    assert_eq!(config.cli_command, "claude");
    assert_eq!(config.permission_mode, "default");
    assert!(config.model.is_none());
    assert!(config.log_dir.is_none());
}

#[test]
fn rejects_zero_max_concurrency() {
    let mut args = base_args();
    args.extend(["--max-concurrency", "0"]);
    let config = Config::try_parse_from(args).unwrap();

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::ZeroConcurrency));
}

#[test]
fn rejects_zero_pool_target_size() {
    let mut args = base_args();
    args.extend(["--pool-target-size", "0"]);
    let config = Config::try_parse_from(args).unwrap();

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::ZeroPoolSize));
}

#[test]
fn rejects_invalid_transport_url() {
    let mut args = vec![
        "convoyd",
        "--repo-path",
        "/tmp/repo",
        "--agent-id",
        "agent-1",
        "--transport-url",
        "not a url",
        "--config-dir",
        "/tmp/config",
    ];
    args.dedup();
    let config = Config::try_parse_from(args).unwrap();

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidUrl(_)));
}

#[test]
fn state_path_and_worktree_base_are_scoped_under_config_dir() {
    let config = Config::try_parse_from(base_args()).unwrap();
    assert_eq!(config.state_path(), PathBuf::from("/tmp/config/state.json"));
    assert_eq!(config.worktree_base(), PathBuf::from("/tmp/config/worktrees"));
}
