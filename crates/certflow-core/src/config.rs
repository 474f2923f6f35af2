use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CertflowError, Result};

/// Top-level certflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub collaborators: Option<CollaboratorsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Largest accepted upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// What the invalid-document path reports for checks that already ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidDocumentPolicy {
    /// Every detail is reported as failed, earlier logo/signature results
    /// are dropped.
    #[default]
    Discard,
    /// Earlier logo/signature results are carried into the details.
    Preserve,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Upper bound on concurrently running fan-out branches.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Deadline for any single node or branch (0 = no deadline).
    #[serde(default = "default_node_timeout_secs")]
    pub node_timeout_secs: u64,
    #[serde(default)]
    pub invalid_document: InvalidDocumentPolicy,
    /// Distinct vocabulary matches needed to admit a document.
    #[serde(default = "default_gate_threshold")]
    pub gate_threshold: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            node_timeout_secs: default_node_timeout_secs(),
            invalid_document: InvalidDocumentPolicy::default(),
            gate_threshold: default_gate_threshold(),
        }
    }
}

/// Remote document-intelligence service backing the collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorsConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_collaborator_timeout")]
    pub timeout_secs: u64,
}

fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }
fn default_max_concurrency() -> usize { 8 }
fn default_node_timeout_secs() -> u64 { 120 }
fn default_gate_threshold() -> usize { 3 }
fn default_collaborator_timeout() -> u64 { 60 }

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| CertflowError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: AppConfig =
            toml::from_str(&expanded).map_err(|e| CertflowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workflow.max_concurrency == 0 {
            return Err(CertflowError::Config(
                "workflow.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.workflow.gate_threshold == 0 {
            return Err(CertflowError::Config(
                "workflow.gate_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_CERTFLOW_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_CERTFLOW_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_CERTFLOW_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_CERTFLOW_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_CERTFLOW_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.workflow.max_concurrency, 8);
        assert_eq!(config.workflow.node_timeout_secs, 120);
        assert_eq!(config.workflow.gate_threshold, 3);
        assert_eq!(config.workflow.invalid_document, InvalidDocumentPolicy::Discard);
        assert!(config.collaborators.is_none());
    }

    #[test]
    fn test_preserve_policy_and_collaborators() {
        let toml_str = r#"
[workflow]
invalid_document = "preserve"
max_concurrency = 2

[collaborators]
base_url = "http://localhost:9000"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.workflow.invalid_document, InvalidDocumentPolicy::Preserve);
        assert_eq!(config.workflow.max_concurrency, 2);
        let collab = config.collaborators.unwrap();
        assert_eq!(collab.base_url, "http://localhost:9000");
        assert_eq!(collab.timeout_secs, 60);
        assert!(collab.api_key.is_none());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.workflow.max_concurrency = 0;
        assert!(matches!(config.validate(), Err(CertflowError::Config(_))));
    }
}
