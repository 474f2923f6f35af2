use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertflowError {
    // Graph construction errors
    #[error("Node already registered: {0}")]
    DuplicateNode(String),

    #[error("Node not found in graph: {0}")]
    UnknownNode(String),

    #[error("Edge {from} -> {to} would close a cycle: {path}")]
    Cycle {
        from: String,
        to: String,
        path: String,
    },

    #[error("Router after '{0}' returned no targets")]
    DeadEnd(String),

    #[error("Router after '{from}' targeted undeclared node '{to}'")]
    UndeclaredTarget { from: String, to: String },

    #[error("Graph has no entry node")]
    MissingEntry,

    // Run errors
    #[error("Node '{node}' failed: {message}")]
    NodeFailed { node: String, message: String },

    #[error("Node '{node}' timed out after {timeout_secs}s")]
    NodeTimeout { node: String, timeout_secs: u64 },

    #[error("Branch task for '{node}' aborted: {message}")]
    BranchAborted { node: String, message: String },

    // Collaborator errors
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Collaborator {collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CertflowError {
    /// Shorthand for a failing external collaborator.
    pub fn collaborator(collaborator: impl Into<String>, message: impl ToString) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            message: message.to_string(),
        }
    }

    /// True for graph wiring mistakes. Router misconfiguration
    /// (`DeadEnd`, `UndeclaredTarget`) only surfaces once the router runs.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::DuplicateNode(_)
                | Self::UnknownNode(_)
                | Self::Cycle { .. }
                | Self::DeadEnd(_)
                | Self::UndeclaredTarget { .. }
                | Self::MissingEntry
        )
    }
}

pub type Result<T> = std::result::Result<T, CertflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_misconfiguration_is_construction() {
        assert!(CertflowError::DeadEnd("extract".into()).is_construction());
        assert!(CertflowError::UndeclaredTarget {
            from: "extract".into(),
            to: "ghost".into(),
        }
        .is_construction());
        assert!(CertflowError::MissingEntry.is_construction());
    }

    #[test]
    fn test_run_failures_are_not_construction() {
        assert!(!CertflowError::collaborator("logo", "HTTP 503").is_construction());
        assert!(!CertflowError::NodeTimeout {
            node: "validate_page".into(),
            timeout_secs: 1,
        }
        .is_construction());
        assert!(!CertflowError::InvalidRequest("empty".into()).is_construction());
    }
}
