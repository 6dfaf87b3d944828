//! Error type display and conversion tests.

use agent_keepintouch::AppError;

#[test]
fn display_prefixes_identify_the_failure_class() {
    let cases = [
        (AppError::Config("bad file".into()), "config: bad file"),
        (
            AppError::Validation("task_id must not be empty".into()),
            "validation: task_id must not be empty",
        ),
        (
            AppError::Unavailable("pool closed".into()),
            "system unavailable: pool closed",
        ),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn toml_errors_become_config_errors() {
    let result: Result<toml::Value, _> = toml::from_str("not = valid = toml");
    let err = AppError::from(result.expect_err("invalid toml"));

    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
    assert!(err.to_string().starts_with("config: invalid config"));
}

#[test]
fn sqlx_errors_become_unavailable() {
    let err = AppError::from(sqlx::Error::RowNotFound);

    assert!(matches!(err, AppError::Unavailable(_)), "got {err:?}");
    assert!(err.to_string().starts_with("system unavailable:"));
}

#[test]
fn errors_are_sources() {
    let err: Box<dyn std::error::Error> = Box::new(AppError::Validation("nope".into()));
    assert_eq!(err.to_string(), "validation: nope");
}
