use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn test_embedded_config_parses_and_validates() {
    let config = CoordinatorConfig::embedded().expect("embedded config should parse");
    assert_eq!(config.channel_capacity, 256);
    assert_eq!(config.approval_stall_timeout_secs, 300);
    assert!(!config.audit.enabled);
    assert!(config.remediation.tools.contains_key("claude"));
}

#[test]
fn test_embedded_config_uses_builtin_signatures() {
    let config = CoordinatorConfig::embedded().unwrap();
    let kinds: Vec<RemediationKind> = config
        .remediation
        .signatures
        .iter()
        .map(|s| s.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            RemediationKind::ToolNotInstalled,
            RemediationKind::NotAuthenticated
        ]
    );
}

#[test]
fn test_minimal_yaml_gets_defaults() {
    let config: CoordinatorConfig = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.channel_capacity, 256);
    assert_eq!(config.remediation.signatures.len(), 2);
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_capacity_rejected() {
    let config: CoordinatorConfig = serde_yaml::from_str("channel_capacity: 0").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("channel_capacity"));
}

#[test]
fn test_stall_timeout_is_bounded() {
    let at_limit = CoordinatorConfig {
        approval_stall_timeout_secs: MAX_APPROVAL_STALL_TIMEOUT_SECS,
        ..CoordinatorConfig::default()
    };
    assert!(at_limit.validate().is_ok());

    let config = CoordinatorConfig {
        approval_stall_timeout_secs: u64::MAX,
        ..CoordinatorConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("approval_stall_timeout_secs"));
}

#[test]
fn test_invalid_signature_pattern_rejected() {
    let yaml = r#"
remediation:
  signatures:
    - kind: not_authenticated
      pattern: "(unclosed"
"#;
    let config: CoordinatorConfig = serde_yaml::from_str(yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("not authenticated"));
}

#[test]
fn test_empty_tool_binary_rejected() {
    let yaml = r#"
remediation:
  tools:
    claude:
      binary: "  "
"#;
    let config: CoordinatorConfig = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_stall_timeout_zero_disables() {
    let config: CoordinatorConfig =
        serde_yaml::from_str("approval_stall_timeout_secs: 0").unwrap();
    assert_eq!(config.approval_stall_timeout(), None);

    let config = CoordinatorConfig::default();
    assert_eq!(
        config.approval_stall_timeout(),
        Some(Duration::from_secs(300))
    );
}

#[test]
fn test_tool_for_unknown_agent_uses_agent_name() {
    let config = CoordinatorConfig::embedded().unwrap();
    let tool = config.tool_for("mystery-agent");
    assert_eq!(tool.binary, "mystery-agent");
    assert!(tool.auth_check.is_empty());

    let claude = config.tool_for("claude");
    assert_eq!(claude.auth_check, vec!["auth", "status"]);
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "channel_capacity: 8\naudit:\n  enabled: true\n").unwrap();

    let config = CoordinatorConfig::load(&path).unwrap();
    assert_eq!(config.channel_capacity, 8);
    assert!(config.audit.enabled);
}

#[test]
fn test_load_missing_file_reports_path() {
    let err = CoordinatorConfig::load(Path::new("/nonexistent/phasectl.yaml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/phasectl.yaml"));
}

#[test]
fn test_resolve_prefers_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("explicit.yaml");
    std::fs::write(&path, "channel_capacity: 3\n").unwrap();

    let config = CoordinatorConfig::resolve(Some(&path)).unwrap();
    assert_eq!(config.channel_capacity, 3);
}

#[test]
#[serial]
fn test_resolve_honors_env_var() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("from-env.yaml");
    std::fs::write(&path, "channel_capacity: 17\n").unwrap();

    std::env::set_var(CONFIG_ENV_VAR, &path);
    let result = CoordinatorConfig::resolve(None);
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(result.unwrap().channel_capacity, 17);
}

#[test]
#[serial]
fn test_resolve_env_var_pointing_nowhere_fails() {
    std::env::set_var(CONFIG_ENV_VAR, "/nonexistent/from-env.yaml");
    let result = CoordinatorConfig::resolve(None);
    std::env::remove_var(CONFIG_ENV_VAR);

    assert!(result.is_err());
}

#[test]
fn test_audit_dir_override() {
    let audit = AuditConfig {
        enabled: true,
        dir: Some(PathBuf::from("/tmp/phasectl-audit")),
    };
    assert_eq!(
        audit.resolved_dir().unwrap(),
        PathBuf::from("/tmp/phasectl-audit")
    );
}
