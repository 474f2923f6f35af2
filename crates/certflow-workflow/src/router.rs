use chrono::NaiveDate;
use tracing::warn;

use certflow_core::state::SharedState;
use certflow_core::types::{SectionTask, WorkerType};

use crate::graph::Route;

pub const VALIDATE_PAGE: &str = "validate_page";
pub const HANDLE_INVALID_DOCUMENT: &str = "handle_invalid_document";

/// Context copied identically into every section task.
#[derive(Debug, Clone, Default)]
pub struct SectionContext {
    pub enterprise: String,
    pub worker: String,
    pub worker_type: WorkerType,
    pub reference_date: Option<NaiveDate>,
}

/// One task per section, in original order, indices starting at 1.
pub fn build_section_tasks(sections: &[String], ctx: &SectionContext) -> Vec<SectionTask> {
    sections
        .iter()
        .enumerate()
        .map(|(i, text)| SectionTask {
            section_index: i + 1,
            section_text: text.clone(),
            enterprise: ctx.enterprise.clone(),
            worker: ctx.worker.clone(),
            worker_type: ctx.worker_type,
            reference_date: ctx.reference_date,
            validated_data: None,
            verdict: None,
        })
        .collect()
}

/// Router after extraction: fan out one `validate_page` branch per section,
/// or send the run to the invalid-document terminal when there is nothing to
/// validate.
pub fn route_sections(state: &SharedState) -> Vec<Route<SectionTask>> {
    match state.page_contents.as_deref() {
        Some(tasks) if !tasks.is_empty() => tasks
            .iter()
            .map(|task| Route::send(VALIDATE_PAGE, task.clone()))
            .collect(),
        _ => {
            warn!(run_id = %state.run_id, "Document not admitted or no sections produced");
            vec![Route::to(HANDLE_INVALID_DOCUMENT)]
        }
    }
}
