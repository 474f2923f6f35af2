use std::io::Write;

use certflow_core::config::{AppConfig, InvalidDocumentPolicy};
use certflow_core::error::CertflowError;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[server]
bind = "0.0.0.0:9090"
max_upload_bytes = 1048576

[workflow]
max_concurrency = 4
node_timeout_secs = 30
invalid_document = "preserve"
gate_threshold = 2

[collaborators]
base_url = "http://docintel.internal:7000"
api_key = "dk-test"
timeout_secs = 15
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.server.bind, "0.0.0.0:9090");
    assert_eq!(config.server.max_upload_bytes, 1_048_576);
    assert_eq!(config.workflow.max_concurrency, 4);
    assert_eq!(config.workflow.node_timeout_secs, 30);
    assert_eq!(config.workflow.invalid_document, InvalidDocumentPolicy::Preserve);
    assert_eq!(config.workflow.gate_threshold, 2);

    let collab = config.collaborators.expect("collaborators section");
    assert_eq!(collab.base_url, "http://docintel.internal:7000");
    assert_eq!(collab.api_key, Some("dk-test".to_string()));
    assert_eq!(collab.timeout_secs, 15);
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("CERTFLOW_TEST_API_KEY", "expanded-key-value");

    let toml_content = r#"
[collaborators]
base_url = "http://localhost:7000"
api_key = "${CERTFLOW_TEST_API_KEY}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    let collab = config.collaborators.expect("collaborators section");
    assert_eq!(collab.api_key, Some("expanded-key-value".to_string()));
    assert_eq!(collab.timeout_secs, 60);

    std::env::remove_var("CERTFLOW_TEST_API_KEY");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[server]\n").expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.server.bind, "127.0.0.1:8080");
    assert_eq!(config.server.max_upload_bytes, 20 * 1024 * 1024);
    assert_eq!(config.workflow.max_concurrency, 8);
    assert_eq!(config.workflow.node_timeout_secs, 120);
    assert_eq!(config.workflow.invalid_document, InvalidDocumentPolicy::Discard);
    assert_eq!(config.workflow.gate_threshold, 3);
    assert!(config.collaborators.is_none());
}

#[test]
fn test_zero_concurrency_rejected() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[workflow]\nmax_concurrency = 0\n")
        .expect("write toml");

    let err = AppConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, CertflowError::Config(ref m) if m.contains("max_concurrency")));
}

#[test]
fn test_unknown_policy_rejected() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[workflow]\ninvalid_document = \"keep\"\n")
        .expect("write toml");

    assert!(matches!(
        AppConfig::load(tmp.path()),
        Err(CertflowError::Config(_))
    ));
}

#[test]
fn test_missing_file_reports_path() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/certflow.toml")).unwrap_err();
    assert!(matches!(err, CertflowError::ConfigNotFound(ref p) if p.contains("certflow.toml")));
}
