use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use certflow_core::types::{DocumentRef, FinalVerdict, StructuredContent};
use certflow_workflow::ValidationRequest;

use crate::error::ApiError;
use crate::state::AppState;

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Body of a completed validation run.
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub extracted_text: Option<String>,
    pub component: Option<StructuredContent>,
    pub person_name: String,
    pub segmented_sections: Option<Vec<String>>,
    pub final_verdict: Option<FinalVerdict>,
}

/// Multipart fields of a validation upload.
#[derive(Default)]
struct UploadForm {
    file: Option<DocumentRef>,
    person_name: Option<String>,
    user_date: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    form.file = Some(DocumentRef::new(file_name, bytes.to_vec()));
                }
                "person_name" => form.person_name = Some(field.text().await?),
                "user_date" => form.user_date = Some(field.text().await?),
                other => debug!(field = other, "Ignoring unknown multipart field"),
            }
        }
        Ok(form)
    }

    fn into_request(self) -> Result<ValidationRequest, ApiError> {
        let file = self
            .file
            .ok_or_else(|| ApiError::BadRequest("missing 'file' field".to_string()))?;
        if !file.is_pdf() {
            return Err(ApiError::BadRequest(
                "only PDF files are accepted".to_string(),
            ));
        }
        let person = self.person_name.unwrap_or_default();
        if person.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "person_name must be a name or an 8-digit DNI".to_string(),
            ));
        }
        let reference_date = match self.user_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ApiError::BadRequest(format!("user_date '{}' is not YYYY-MM-DD", raw))
            })?),
        };
        Ok(ValidationRequest {
            file,
            person,
            reference_date,
        })
    }
}

// POST /api/document/v2/validate
pub async fn validate_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ValidationResponse>, ApiError> {
    let request = UploadForm::read(multipart).await?.into_request()?;
    info!(
        file = %request.file.file_name,
        bytes = request.file.len(),
        "Validation upload received"
    );

    let result = state.workflow.validate(request).await?;

    Ok(Json(ValidationResponse {
        extracted_text: result.extracted_text,
        component: result.structured_content,
        person_name: result.worker,
        segmented_sections: result.segmented_sections,
        final_verdict: result.final_verdict,
    }))
}
