use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{DocumentRef, SectionTask, SectionValidation};

/// OCR / text layer access.
pub trait TextExtractor: Send + Sync + 'static {
    /// Best-effort plain text of the whole document. Fails with
    /// `CertflowError::Extraction` on unreadable input.
    fn extract_full_text(&self, file: DocumentRef) -> BoxFuture<'_, Result<String>>;

    fn count_pages(&self, file: DocumentRef) -> BoxFuture<'_, Result<usize>>;
}

/// Semantic segmentation, typically backed by a language model.
pub trait Segmenter: Send + Sync + 'static {
    /// Ordered section texts. `page_count` selects the multi-page or
    /// single-page strategy. A single element is a legitimate result.
    fn segment_into_sections(
        &self,
        file: DocumentRef,
        page_count: usize,
    ) -> BoxFuture<'_, Result<Vec<String>>>;
}

/// Name of the employer the certificate was issued to.
pub trait EnterpriseExtractor: Send + Sync + 'static {
    fn extract_enterprise_name(&self, file: DocumentRef) -> BoxFuture<'_, Result<String>>;
}

/// Whole-document image checks.
pub trait ImageDetector: Send + Sync + 'static {
    fn detect_logo(&self, file: DocumentRef) -> BoxFuture<'_, Result<bool>>;

    fn detect_signatures(&self, file: DocumentRef) -> BoxFuture<'_, Result<bool>>;
}

/// Per-section domain validator, invoked once per fan-out branch.
pub trait SectionValidator: Send + Sync + 'static {
    fn validate_section(&self, task: SectionTask) -> BoxFuture<'_, Result<SectionValidation>>;
}

/// The full set of collaborators a validation run depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub text: Arc<dyn TextExtractor>,
    pub segmenter: Arc<dyn Segmenter>,
    pub enterprise: Arc<dyn EnterpriseExtractor>,
    pub detector: Arc<dyn ImageDetector>,
    pub validator: Arc<dyn SectionValidator>,
}

impl Collaborators {
    /// Use one object for every collaborator role.
    pub fn from_single<T>(all: Arc<T>) -> Self
    where
        T: TextExtractor + Segmenter + EnterpriseExtractor + ImageDetector + SectionValidator,
    {
        Self {
            text: all.clone(),
            segmenter: all.clone(),
            enterprise: all.clone(),
            detector: all.clone(),
            validator: all,
        }
    }
}
