//! Shared run state and its merge policy.
//!
//! Nodes never touch [`SharedState`] directly. Each returns a
//! [`StateUpdate`] and the executor folds it in through [`SharedState::apply`],
//! which consults [`MERGE_POLICIES`] for every field.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{
    DocumentRef, FinalVerdict, RunId, SectionResult, SectionTask, StructuredContent, WorkerType,
};

/// How an incoming partial value combines with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Incoming value replaces the prior one. Absent values are ignored.
    Overwrite,
    /// Incoming elements are added and the sequence is kept sorted by
    /// section index. Equal indices keep application order.
    Append,
}

/// Fields of [`SharedState`] that a node may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    ExtractedText,
    StructuredContent,
    SegmentedSections,
    PageCount,
    Enterprise,
    LogoPassed,
    SignaturesPassed,
    PageContents,
    SectionResults,
    FinalVerdict,
}

pub const MERGE_POLICIES: &[(StateField, MergePolicy)] = &[
    (StateField::ExtractedText, MergePolicy::Overwrite),
    (StateField::StructuredContent, MergePolicy::Overwrite),
    (StateField::SegmentedSections, MergePolicy::Overwrite),
    (StateField::PageCount, MergePolicy::Overwrite),
    (StateField::Enterprise, MergePolicy::Overwrite),
    (StateField::LogoPassed, MergePolicy::Overwrite),
    (StateField::SignaturesPassed, MergePolicy::Overwrite),
    (StateField::PageContents, MergePolicy::Overwrite),
    (StateField::SectionResults, MergePolicy::Append),
    (StateField::FinalVerdict, MergePolicy::Overwrite),
];

pub fn policy_of(field: StateField) -> MergePolicy {
    MERGE_POLICIES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, p)| *p)
        .unwrap_or(MergePolicy::Overwrite)
}

/// Anything carrying a section index can live in an append field.
pub trait SectionOrdered {
    fn section_index(&self) -> usize;
}

impl SectionOrdered for SectionResult {
    fn section_index(&self) -> usize {
        self.section_index
    }
}

impl SectionOrdered for SectionTask {
    fn section_index(&self) -> usize {
        self.section_index
    }
}

fn merge_option<T>(policy: MergePolicy, slot: &mut Option<T>, incoming: Option<T>) {
    debug_assert_eq!(policy, MergePolicy::Overwrite, "scalar fields only overwrite");
    if let Some(value) = incoming {
        *slot = Some(value);
    }
}

fn merge_sequence<T: SectionOrdered>(policy: MergePolicy, seq: &mut Vec<T>, incoming: Vec<T>) {
    if incoming.is_empty() {
        return;
    }
    match policy {
        MergePolicy::Overwrite => *seq = incoming,
        MergePolicy::Append => {
            seq.extend(incoming);
            // stable: ties keep application order
            seq.sort_by_key(|item| item.section_index());
        }
    }
}

/// Orchestration record for one validation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    pub run_id: RunId,
    pub file: DocumentRef,
    pub worker: String,
    pub worker_type: WorkerType,
    pub reference_date: Option<NaiveDate>,

    pub extracted_text: Option<String>,
    pub structured_content: Option<StructuredContent>,
    pub segmented_sections: Option<Vec<String>>,
    pub page_count: Option<usize>,
    pub enterprise: Option<String>,

    pub logo_passed: Option<bool>,
    pub signatures_passed: Option<bool>,

    /// `Some(empty)` or `None` marks an invalid document.
    pub page_contents: Option<Vec<SectionTask>>,
    pub section_results: Vec<SectionResult>,

    /// Only set on a fan-out branch's private copy.
    #[serde(skip)]
    pub current_section: Option<SectionTask>,

    pub final_verdict: Option<FinalVerdict>,
}

impl SharedState {
    pub fn new(
        file: DocumentRef,
        worker: impl Into<String>,
        worker_type: WorkerType,
        reference_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            file,
            worker: worker.into(),
            worker_type,
            reference_date,
            ..Default::default()
        }
    }

    /// True once extraction produced at least one section task.
    pub fn has_sections(&self) -> bool {
        self.page_contents.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Fold one partial update into the state.
    pub fn apply(&mut self, update: StateUpdate) {
        merge_option(
            policy_of(StateField::ExtractedText),
            &mut self.extracted_text,
            update.extracted_text,
        );
        merge_option(
            policy_of(StateField::StructuredContent),
            &mut self.structured_content,
            update.structured_content,
        );
        merge_option(
            policy_of(StateField::SegmentedSections),
            &mut self.segmented_sections,
            update.segmented_sections,
        );
        merge_option(
            policy_of(StateField::PageCount),
            &mut self.page_count,
            update.page_count,
        );
        merge_option(
            policy_of(StateField::Enterprise),
            &mut self.enterprise,
            update.enterprise,
        );
        merge_option(
            policy_of(StateField::LogoPassed),
            &mut self.logo_passed,
            update.logo_passed,
        );
        merge_option(
            policy_of(StateField::SignaturesPassed),
            &mut self.signatures_passed,
            update.signatures_passed,
        );
        merge_option(
            policy_of(StateField::PageContents),
            &mut self.page_contents,
            update.page_contents,
        );

        let touched_sections = !update.section_results.is_empty();
        merge_sequence(
            policy_of(StateField::SectionResults),
            &mut self.section_results,
            update.section_results,
        );
        if touched_sections {
            self.backfill_page_contents();
        }

        merge_option(
            policy_of(StateField::FinalVerdict),
            &mut self.final_verdict,
            update.final_verdict,
        );
    }

    /// Apply updates in the given order. An empty iterator is a no-op.
    pub fn apply_all(&mut self, updates: impl IntoIterator<Item = StateUpdate>) {
        for update in updates {
            self.apply(update);
        }
    }

    fn backfill_page_contents(&mut self) {
        let Some(tasks) = self.page_contents.as_mut() else {
            return;
        };
        for result in &self.section_results {
            if let Some(task) = tasks
                .iter_mut()
                .find(|t| t.section_index == result.section_index)
            {
                task.validated_data = Some(result.validated_data.clone());
                task.verdict = Some(result.verdict.clone());
            }
        }
    }
}

/// Partial write returned by a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub extracted_text: Option<String>,
    pub structured_content: Option<StructuredContent>,
    pub segmented_sections: Option<Vec<String>>,
    pub page_count: Option<usize>,
    pub enterprise: Option<String>,
    pub logo_passed: Option<bool>,
    pub signatures_passed: Option<bool>,
    pub page_contents: Option<Vec<SectionTask>>,
    pub section_results: Vec<SectionResult>,
    pub final_verdict: Option<FinalVerdict>,
}

impl StateUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
