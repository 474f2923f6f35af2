//! Shared test utilities, mocks, and fixtures for certflow crates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

use certflow_core::error::{CertflowError, Result};
use certflow_core::traits::{
    Collaborators, EnterpriseExtractor, ImageDetector, SectionValidator, Segmenter, TextExtractor,
};
use certflow_core::types::{
    DocumentRef, InsuredPerson, SectionTask, SectionValidation, SectionVerdict, ValidatedData,
};

/// Text that passes the admission gate (four vocabulary terms).
pub const SCTR_TEXT: &str = "CONSTANCIA DE SEGURO COMPLEMENTARIO DE TRABAJO DE RIESGO\n\
     Póliza N° 7001234\nVigencia: 01/03/2024 al 31/03/2024\n\
     Empresa: CONSTRUCTORA ANDINA SAC";

/// A generic invoice: one vocabulary match ("cobertura").
pub const INVOICE_TEXT: &str = "FACTURA ELECTRÓNICA F001-2231\nServicio de cobertura de eventos\nTOTAL S/ 850.00";

/// Collaborator with a fixed script, usable in every collaborator role.
///
/// Section verdicts are keyed by section index (default: pass). Per-section
/// delays let tests force branches to complete out of order.
pub struct ScriptedCollaborators {
    pub text: String,
    pub pages: usize,
    pub sections: Vec<String>,
    pub enterprise: std::result::Result<String, String>,
    pub logo: bool,
    pub signatures: bool,
    pub verdicts: HashMap<usize, SectionVerdict>,
    pub delays: HashMap<usize, Duration>,
    pub fail_section: Option<usize>,
    pub fail_extraction: bool,
    seen: Mutex<Vec<SectionTask>>,
    calls: AtomicUsize,
}

impl Default for ScriptedCollaborators {
    fn default() -> Self {
        Self {
            text: SCTR_TEXT.to_string(),
            pages: 1,
            sections: vec!["Sección única".to_string()],
            enterprise: Ok("CONSTRUCTORA ANDINA SAC".to_string()),
            logo: true,
            signatures: true,
            verdicts: HashMap::new(),
            delays: HashMap::new(),
            fail_section: None,
            fail_extraction: false,
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedCollaborators {
    /// An admitted certificate split into `n` sections.
    pub fn with_sections(n: usize) -> Self {
        Self {
            pages: n.max(1),
            sections: (1..=n).map(|i| format!("Sección {} de la constancia", i)).collect(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn verdict(mut self, index: usize, verdict: SectionVerdict) -> Self {
        self.verdicts.insert(index, verdict);
        self
    }

    pub fn delay(mut self, index: usize, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    pub fn logo(mut self, passed: bool) -> Self {
        self.logo = passed;
        self
    }

    pub fn signatures(mut self, passed: bool) -> Self {
        self.signatures = passed;
        self
    }

    pub fn enterprise_fails(mut self) -> Self {
        self.enterprise = Err("enterprise model unavailable".to_string());
        self
    }

    pub fn fail_section(mut self, index: usize) -> Self {
        self.fail_section = Some(index);
        self
    }

    pub fn fail_extraction(mut self) -> Self {
        self.fail_extraction = true;
        self
    }

    /// Wrap into a [`Collaborators`] set, keeping a handle for assertions.
    pub fn into_collaborators(self) -> (Collaborators, Arc<Self>) {
        let shared = Arc::new(self);
        (Collaborators::from_single(shared.clone()), shared)
    }

    /// Section tasks received by the validator, in arrival order.
    pub fn seen_tasks(&self) -> Vec<SectionTask> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of validator invocations.
    pub fn validator_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Minimal PDF upload fixture.
pub fn pdf(name: &str) -> DocumentRef {
    DocumentRef::new(name, b"%PDF-1.7\n%fixture".to_vec())
}

/// Section verdict failing only the validity dimension.
pub fn expired() -> SectionVerdict {
    SectionVerdict {
        dates_valid: false,
        person_found: true,
        notes: Some("coverage ended before reference date".to_string()),
    }
}

/// Section verdict failing only the person dimension.
pub fn person_missing() -> SectionVerdict {
    SectionVerdict {
        dates_valid: true,
        person_found: false,
        notes: Some("worker not in insured list".to_string()),
    }
}

impl TextExtractor for ScriptedCollaborators {
    fn extract_full_text(&self, _file: DocumentRef) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            if self.fail_extraction {
                return Err(CertflowError::Extraction("unreadable PDF".to_string()));
            }
            Ok(self.text.clone())
        })
    }

    fn count_pages(&self, _file: DocumentRef) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move { Ok(self.pages) })
    }
}

impl Segmenter for ScriptedCollaborators {
    fn segment_into_sections(
        &self,
        _file: DocumentRef,
        _page_count: usize,
    ) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move { Ok(self.sections.clone()) })
    }
}

impl EnterpriseExtractor for ScriptedCollaborators {
    fn extract_enterprise_name(&self, _file: DocumentRef) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            self.enterprise
                .clone()
                .map_err(|m| CertflowError::collaborator("enterprise", m))
        })
    }
}

impl ImageDetector for ScriptedCollaborators {
    fn detect_logo(&self, _file: DocumentRef) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move { Ok(self.logo) })
    }

    fn detect_signatures(&self, _file: DocumentRef) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move { Ok(self.signatures) })
    }
}

impl SectionValidator for ScriptedCollaborators {
    fn validate_section(&self, task: SectionTask) -> BoxFuture<'_, Result<SectionValidation>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(&task.section_index) {
                tokio::time::sleep(*delay).await;
            }
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(task.clone());
            }
            if self.fail_section == Some(task.section_index) {
                return Err(CertflowError::collaborator(
                    "section-validator",
                    format!("model refused section {}", task.section_index),
                ));
            }
            let verdict = self
                .verdicts
                .get(&task.section_index)
                .cloned()
                .unwrap_or_else(SectionVerdict::pass);
            Ok(SectionValidation {
                validated_data: ValidatedData {
                    policy_number: Some("7001234".to_string()),
                    company: Some(task.enterprise.clone()),
                    person_by_policy: vec![InsuredPerson {
                        full_name: task.worker.clone(),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                verdict,
            })
        })
    }
}
