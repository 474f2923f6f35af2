use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use certflow_core::config::{InvalidDocumentPolicy, WorkflowConfig};
use certflow_core::error::{CertflowError, Result};
use certflow_core::state::{SharedState, StateUpdate};
use certflow_core::traits::Collaborators;
use certflow_core::types::{normalize_worker, DocumentRef, SectionResult, StructuredContent};

use crate::gate::DocumentGate;
use crate::graph::{ExecutionResult, ExecutorOptions, GraphBuilder, GraphExecutor, Node};
use crate::router::{
    build_section_tasks, route_sections, SectionContext, HANDLE_INVALID_DOCUMENT, VALIDATE_PAGE,
};
use crate::verdict::{compile_verdict, invalid_document_verdict, DocumentSignals};

pub const LOGO_DETECTION: &str = "logo_detection";
pub const DETECT_SIGNATURES: &str = "detect_signatures";
pub const EXTRACT_PAGES_CONTENT: &str = "extract_pages_content";
pub const COMPILE_VERDICT: &str = "compile_verdict";

/// Tunables for building a [`ValidationWorkflow`].
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub max_concurrency: usize,
    pub node_timeout: Option<Duration>,
    pub invalid_document: InvalidDocumentPolicy,
    pub gate_threshold: usize,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for WorkflowOptions {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            node_timeout: (config.node_timeout_secs > 0)
                .then(|| Duration::from_secs(config.node_timeout_secs)),
            invalid_document: config.invalid_document,
            gate_threshold: config.gate_threshold,
        }
    }
}

/// A validation request as received from a caller.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub file: DocumentRef,
    /// Person name or 8-digit identity number, not yet normalized.
    pub person: String,
    pub reference_date: Option<NaiveDate>,
}

impl ValidationRequest {
    /// Validate the request and build the initial shared state.
    pub fn into_state(self) -> Result<SharedState> {
        if !self.file.is_pdf() {
            return Err(CertflowError::InvalidRequest(
                "only PDF files are accepted".to_string(),
            ));
        }
        let (worker, worker_type) = normalize_worker(&self.person)?;
        info!(file = %self.file.file_name, worker_type = %worker_type, "Validation request accepted");
        Ok(SharedState::new(
            self.file,
            worker,
            worker_type,
            self.reference_date,
        ))
    }
}

/// The certificate validation graph:
///
/// `logo_detection -> detect_signatures -> extract_pages_content`, then either
/// one `validate_page` branch per section joined at `compile_verdict`, or the
/// `handle_invalid_document` terminal.
pub struct ValidationWorkflow {
    graph: GraphExecutor<SharedState>,
}

impl ValidationWorkflow {
    pub fn new(collaborators: Collaborators, options: WorkflowOptions) -> Result<Self> {
        let collab = Arc::new(collaborators);
        let gate = Arc::new(DocumentGate::new(options.gate_threshold));
        let policy = options.invalid_document;

        let mut builder = GraphBuilder::new();

        let c = collab.clone();
        builder.add_node(Node::new(LOGO_DETECTION, move |state: SharedState| {
            let c = c.clone();
            async move {
                let passed = c.detector.detect_logo(state.file.clone()).await?;
                info!(run_id = %state.run_id, passed, "Logo check complete");
                Ok(StateUpdate {
                    logo_passed: Some(passed),
                    ..Default::default()
                })
            }
        }))?;

        let c = collab.clone();
        builder.add_node(Node::new(DETECT_SIGNATURES, move |state: SharedState| {
            let c = c.clone();
            async move {
                let passed = c.detector.detect_signatures(state.file.clone()).await?;
                info!(run_id = %state.run_id, passed, "Signature check complete");
                Ok(StateUpdate {
                    signatures_passed: Some(passed),
                    ..Default::default()
                })
            }
        }))?;

        let c = collab.clone();
        builder.add_node(Node::new(EXTRACT_PAGES_CONTENT, move |state: SharedState| {
            let c = c.clone();
            let gate = gate.clone();
            async move { extract_pages_content(&c, &gate, state).await }
        }))?;

        let c = collab.clone();
        builder.add_node(Node::new(VALIDATE_PAGE, move |state: SharedState| {
            let c = c.clone();
            async move { validate_page(&c, state).await }
        }))?;

        builder.add_node(Node::new(COMPILE_VERDICT, |state: SharedState| async move {
            let verdict = compile_verdict(signals_of(&state), &state.section_results);
            info!(
                run_id = %state.run_id,
                accepted = verdict.accepted,
                reason = %verdict.reason,
                sections = state.section_results.len(),
                "Verdict compiled"
            );
            Ok(StateUpdate {
                final_verdict: Some(verdict),
                ..Default::default()
            })
        }))?;

        builder.add_node(Node::new(
            HANDLE_INVALID_DOCUMENT,
            move |state: SharedState| async move {
                warn!(run_id = %state.run_id, "Document is not a recognized work-risk certificate");
                let signals = (state.logo_passed.is_some() || state.signatures_passed.is_some())
                    .then(|| signals_of(&state));
                Ok(StateUpdate {
                    final_verdict: Some(invalid_document_verdict(policy, signals)),
                    ..Default::default()
                })
            },
        ))?;

        builder.add_edge(LOGO_DETECTION, DETECT_SIGNATURES)?;
        builder.add_edge(DETECT_SIGNATURES, EXTRACT_PAGES_CONTENT)?;
        builder.add_conditional_edge(
            EXTRACT_PAGES_CONTENT,
            &[VALIDATE_PAGE, HANDLE_INVALID_DOCUMENT],
            route_sections,
        )?;
        builder.add_edge(VALIDATE_PAGE, COMPILE_VERDICT)?;
        builder.set_entry(LOGO_DETECTION)?;

        let graph = builder.compile(ExecutorOptions {
            max_concurrency: options.max_concurrency,
            node_timeout: options.node_timeout,
        })?;

        Ok(Self { graph })
    }

    /// Run the graph and return the terminal state.
    pub async fn run(&self, initial: SharedState) -> Result<SharedState> {
        Ok(self.run_detailed(initial).await?.state)
    }

    /// Run the graph and keep per-node timing.
    pub async fn run_detailed(&self, initial: SharedState) -> Result<ExecutionResult<SharedState>> {
        let run_id = initial.run_id.clone();
        info!(run_id = %run_id, file = %initial.file.file_name, "Validation run started");

        let result = self.graph.run(initial).await?;

        info!(
            run_id = %run_id,
            elapsed_ms = result.total_elapsed_ms,
            terminal = ?result.terminal_nodes,
            "Validation run finished"
        );
        Ok(result)
    }

    /// Validate a raw request end to end.
    pub async fn validate(&self, request: ValidationRequest) -> Result<SharedState> {
        self.run(request.into_state()?).await
    }
}

fn signals_of(state: &SharedState) -> DocumentSignals {
    DocumentSignals {
        logo_passed: state.logo_passed.unwrap_or(false),
        signatures_passed: state.signatures_passed.unwrap_or(false),
    }
}

async fn extract_pages_content(
    c: &Collaborators,
    gate: &DocumentGate,
    state: SharedState,
) -> Result<StateUpdate> {
    let file = state.file.clone();
    let text = c.text.extract_full_text(file.clone()).await?;
    let structured = StructuredContent::from_text(&text);

    let decision = gate.evaluate(&text);
    if !decision.admitted {
        warn!(
            run_id = %state.run_id,
            matched = ?decision.matched,
            threshold = gate.threshold(),
            "Document rejected by admission gate"
        );
        return Ok(StateUpdate {
            extracted_text: Some(text),
            structured_content: Some(structured),
            segmented_sections: Some(vec![]),
            page_contents: Some(vec![]),
            ..Default::default()
        });
    }

    let pages = c.text.count_pages(file.clone()).await?;
    let sections = c.segmenter.segment_into_sections(file.clone(), pages).await?;

    let enterprise = match c.enterprise.extract_enterprise_name(file).await {
        Ok(name) => name,
        Err(e) => {
            warn!(run_id = %state.run_id, error = %e, "Enterprise name unavailable, continuing without it");
            String::new()
        }
    };

    let ctx = SectionContext {
        enterprise: enterprise.clone(),
        worker: state.worker.clone(),
        worker_type: state.worker_type,
        reference_date: state.reference_date,
    };
    let tasks = build_section_tasks(&sections, &ctx);
    info!(run_id = %state.run_id, pages, sections = tasks.len(), "Document segmented");

    Ok(StateUpdate {
        extracted_text: Some(text),
        structured_content: Some(structured),
        segmented_sections: Some(sections),
        page_count: Some(pages),
        enterprise: Some(enterprise),
        page_contents: Some(tasks),
        ..Default::default()
    })
}

async fn validate_page(c: &Collaborators, state: SharedState) -> Result<StateUpdate> {
    let task = state
        .current_section
        .ok_or_else(|| CertflowError::NodeFailed {
            node: VALIDATE_PAGE.to_string(),
            message: "no section assigned to branch".to_string(),
        })?;
    let index = task.section_index;
    let validation = c.validator.validate_section(task).await?;
    Ok(StateUpdate {
        section_results: vec![SectionResult {
            section_index: index,
            validated_data: validation.validated_data,
            verdict: validation.verdict,
        }],
        ..Default::default()
    })
}
