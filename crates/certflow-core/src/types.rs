use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CertflowError, Result};

/// Unique identifier of one validation run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The uploaded source document. Opaque to the orchestration core; only
/// collaborators look inside `content`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub file_name: String,
    #[serde(skip)]
    pub content: Arc<Vec<u8>>,
}

impl DocumentRef {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content: Arc::new(content),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.file_name.to_lowercase().ends_with(".pdf")
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// How the worker identifier supplied by the caller should be matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerType {
    /// National identity document number (8 digits).
    Dni,
    #[default]
    Name,
}

impl std::fmt::Display for WorkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerType::Dni => write!(f, "dni"),
            WorkerType::Name => write!(f, "name"),
        }
    }
}

fn dni_pattern() -> &'static Regex {
    static DNI: OnceLock<Regex> = OnceLock::new();
    DNI.get_or_init(|| Regex::new(r"^\d{8}$").expect("valid DNI pattern"))
}

/// Normalize a caller-supplied person name or identity number.
///
/// Exactly eight digits are kept verbatim as a [`WorkerType::Dni`];
/// anything else is upper-cased with runs of whitespace collapsed.
pub fn normalize_worker(input: &str) -> Result<(String, WorkerType)> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CertflowError::InvalidRequest(
            "person name or DNI is required".to_string(),
        ));
    }

    if dni_pattern().is_match(trimmed) {
        return Ok((trimmed.to_string(), WorkerType::Dni));
    }

    let name = trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    Ok((name, WorkerType::Name))
}

/// An insured person listed on a certificate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsuredPerson {
    pub full_name: String,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub coverage_start_date: Option<String>,
}

/// Structured fields pulled out of one section by the section validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatedData {
    #[serde(default)]
    pub validity: Option<String>,
    #[serde(default)]
    pub start_date_validity: Option<String>,
    #[serde(default)]
    pub end_date_validity: Option<String>,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub insurance_company: Option<String>,
    #[serde(default)]
    pub date_of_issuance: Option<String>,
    #[serde(default)]
    pub person_by_policy: Vec<InsuredPerson>,
    #[serde(default)]
    pub signatories: Vec<String>,
}

/// Outcome of validating a single section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionVerdict {
    /// Validity window covers the reference date.
    pub dates_valid: bool,
    /// The requested worker appears among the insured persons.
    pub person_found: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SectionVerdict {
    pub fn pass() -> Self {
        Self {
            dates_valid: true,
            person_found: true,
            notes: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.dates_valid && self.person_found
    }
}

/// What a section validator returns for one fan-out branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionValidation {
    pub validated_data: ValidatedData,
    pub verdict: SectionVerdict,
}

/// One unit of fan-out work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionTask {
    /// 1-based position in the original segmentation order.
    pub section_index: usize,
    pub section_text: String,
    pub enterprise: String,
    pub worker: String,
    pub worker_type: WorkerType,
    pub reference_date: Option<NaiveDate>,
    #[serde(default)]
    pub validated_data: Option<ValidatedData>,
    #[serde(default)]
    pub verdict: Option<SectionVerdict>,
}

/// A branch's contribution to the joined state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionResult {
    pub section_index: usize,
    pub validated_data: ValidatedData,
    pub verdict: SectionVerdict,
}

/// Metadata recorded alongside the raw extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub total_length: usize,
    pub document_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredContent {
    pub raw_text: String,
    pub metadata: ContentMetadata,
}

impl StructuredContent {
    pub fn from_text(text: &str) -> Self {
        Self {
            raw_text: text.to_string(),
            metadata: ContentMetadata {
                total_length: text.chars().count(),
                document_type: "SCTR".to_string(),
            },
        }
    }
}

/// The checks a final verdict reports on, in reason priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictDimension {
    Logo,
    Validity,
    Signature,
    Person,
}

impl VerdictDimension {
    pub const PRIORITY: [VerdictDimension; 4] = [
        VerdictDimension::Logo,
        VerdictDimension::Validity,
        VerdictDimension::Signature,
        VerdictDimension::Person,
    ];

    pub fn failure_reason(&self) -> &'static str {
        match self {
            VerdictDimension::Logo => "insurer logo could not be verified",
            VerdictDimension::Validity => "validity dates do not cover the reference date",
            VerdictDimension::Signature => "required signatures were not found",
            VerdictDimension::Person => "worker not listed as an insured person",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictDetails {
    pub logo_validation_passed: bool,
    pub validity_validation_passed: bool,
    pub signature_validation_passed: bool,
    pub person_validation_passed: bool,
}

impl VerdictDetails {
    pub fn get(&self, dimension: VerdictDimension) -> bool {
        match dimension {
            VerdictDimension::Logo => self.logo_validation_passed,
            VerdictDimension::Validity => self.validity_validation_passed,
            VerdictDimension::Signature => self.signature_validation_passed,
            VerdictDimension::Person => self.person_validation_passed,
        }
    }

    /// First failing dimension in priority order.
    pub fn first_failure(&self) -> Option<VerdictDimension> {
        VerdictDimension::PRIORITY
            .into_iter()
            .find(|d| !self.get(*d))
    }
}

/// Per-section line of a final verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionOutcome {
    pub section_index: usize,
    pub passed: bool,
    pub dates_valid: bool,
    pub person_found: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalVerdict {
    pub accepted: bool,
    pub reason: String,
    pub details: VerdictDetails,
    #[serde(default)]
    pub sections: Vec<SectionOutcome>,
}

pub const INVALID_DOCUMENT_REASON: &str = "not a recognized document of the expected family";
