//! Configuration parsing and validation tests.

use std::io::Write;
use std::path::PathBuf;

use agent_keepintouch::config::SupervisorConfig;
use agent_keepintouch::AppError;

#[test]
fn minimal_config_applies_documented_defaults() {
    let config =
        SupervisorConfig::from_toml_str("db_path = \"/tmp/kit.db\"").expect("valid config");

    assert_eq!(config.db_path, PathBuf::from("/tmp/kit.db"));
    assert_eq!(config.check_in_interval_seconds, 1800);
    assert_eq!(config.missed_check_in_threshold, 2);
    assert_eq!(config.pending_backoff_seconds, 30);
    assert!(config.sweep.enabled);
    assert_eq!(config.sweep.interval_seconds, 60);
    assert_eq!(config.audit_log_dir, None);
}

#[test]
fn full_config_parses_every_field() {
    let toml = r#"
db_path = "/var/lib/keepintouch/state.db"
check_in_interval_seconds = 600
missed_check_in_threshold = 3
pending_backoff_seconds = 15
audit_log_dir = "/var/log/keepintouch"

[sweep]
enabled = false
interval_seconds = 120
"#;
    let config = SupervisorConfig::from_toml_str(toml).expect("valid config");

    assert_eq!(config.check_in_interval_seconds, 600);
    assert_eq!(config.missed_check_in_threshold, 3);
    assert_eq!(config.pending_backoff_seconds, 15);
    assert!(!config.sweep.enabled);
    assert_eq!(config.sweep.interval_seconds, 120);
    assert_eq!(
        config.audit_log_dir,
        Some(PathBuf::from("/var/log/keepintouch"))
    );
}

#[test]
fn stale_after_is_interval_times_threshold() {
    let toml = r#"
db_path = "kit.db"
check_in_interval_seconds = 600
missed_check_in_threshold = 3
"#;
    let config = SupervisorConfig::from_toml_str(toml).expect("valid config");
    assert_eq!(config.stale_after_seconds(), 1800);

    let defaults = SupervisorConfig::from_toml_str("db_path = \"kit.db\"").expect("valid config");
    assert_eq!(defaults.stale_after_seconds(), 3600);
}

#[test]
fn zero_thresholds_are_rejected() {
    let cases = [
        ("check_in_interval_seconds = 0", "check_in_interval_seconds"),
        ("missed_check_in_threshold = 0", "missed_check_in_threshold"),
        ("pending_backoff_seconds = 0", "pending_backoff_seconds"),
        ("[sweep]\ninterval_seconds = 0", "sweep.interval_seconds"),
    ];

    for (line, field) in cases {
        let toml = format!("db_path = \"kit.db\"\n{line}");
        let err = SupervisorConfig::from_toml_str(&toml).expect_err("zero must be rejected");
        assert!(matches!(err, AppError::Config(_)), "{field}: got {err:?}");
        assert!(
            err.to_string().contains(field),
            "{field} missing from: {err}"
        );
    }
}

#[test]
fn missing_db_path_is_rejected() {
    let err = SupervisorConfig::from_toml_str("check_in_interval_seconds = 600")
        .expect_err("db_path is required");
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn malformed_toml_is_rejected() {
    let err = SupervisorConfig::from_toml_str("db_path = ").expect_err("broken toml");
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
    assert!(err.to_string().starts_with("config: invalid config"));
}

#[test]
fn load_from_path_reads_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).expect("create config file");
    writeln!(file, "db_path = \"kit.db\"").expect("write config");

    let config = SupervisorConfig::load_from_path(&path).expect("load config");
    assert_eq!(config.check_in_interval_seconds, 1800);

    let err = SupervisorConfig::load_from_path(dir.path().join("absent.toml"))
        .expect_err("missing file");
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
    assert!(err.to_string().contains("failed to read config"));
}
