use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::future::BoxFuture;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use certflow_core::config::CollaboratorsConfig;
use certflow_core::error::{CertflowError, Result};
use certflow_core::traits::{
    EnterpriseExtractor, ImageDetector, SectionValidator, Segmenter, TextExtractor,
};
use certflow_core::types::{DocumentRef, SectionTask, SectionValidation};

/// Collaborators served by a remote document-intelligence service.
///
/// Every call is a JSON `POST` under `base_url`; documents travel base64
/// encoded. No retries: a failed call fails the run.
pub struct RemoteCollaborators {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

// ── Wire types ───────────────────────────────────────────────────

#[derive(Serialize)]
struct DocumentPayload<'a> {
    file_name: &'a str,
    content_base64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_count: Option<usize>,
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

#[derive(Deserialize)]
struct PagesResponse {
    pages: usize,
}

#[derive(Deserialize)]
struct SectionsResponse {
    sections: Vec<String>,
}

#[derive(Deserialize)]
struct EnterpriseResponse {
    name: String,
}

#[derive(Deserialize)]
struct DetectionResponse {
    detected: bool,
}

impl RemoteCollaborators {
    pub fn new(config: &CollaboratorsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CertflowError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B, R>(&self, collaborator: &str, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(collaborator, %url, "Calling collaborator");

        let mut request = self.http.post(&url).json(body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CertflowError::collaborator(collaborator, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CertflowError::collaborator(
                collaborator,
                format!("HTTP {}: {}", status, body),
            ));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| CertflowError::collaborator(collaborator, e))
    }
}

fn document_payload(file: &DocumentRef, page_count: Option<usize>) -> DocumentPayload<'_> {
    DocumentPayload {
        file_name: &file.file_name,
        content_base64: BASE64.encode(file.content.as_slice()),
        page_count,
    }
}

impl TextExtractor for RemoteCollaborators {
    fn extract_full_text(&self, file: DocumentRef) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let resp: TextResponse = self
                .post("ocr", "v1/text", &document_payload(&file, None))
                .await
                .map_err(|e| CertflowError::Extraction(e.to_string()))?;
            Ok(resp.text)
        })
    }

    fn count_pages(&self, file: DocumentRef) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let resp: PagesResponse = self
                .post("ocr", "v1/pages", &document_payload(&file, None))
                .await?;
            Ok(resp.pages)
        })
    }
}

impl Segmenter for RemoteCollaborators {
    fn segment_into_sections(
        &self,
        file: DocumentRef,
        page_count: usize,
    ) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            let resp: SectionsResponse = self
                .post(
                    "segmentation",
                    "v1/segments",
                    &document_payload(&file, Some(page_count)),
                )
                .await?;
            Ok(resp.sections)
        })
    }
}

impl EnterpriseExtractor for RemoteCollaborators {
    fn extract_enterprise_name(&self, file: DocumentRef) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let resp: EnterpriseResponse = self
                .post("enterprise", "v1/enterprise", &document_payload(&file, None))
                .await?;
            Ok(resp.name)
        })
    }
}

impl ImageDetector for RemoteCollaborators {
    fn detect_logo(&self, file: DocumentRef) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let resp: DetectionResponse = self
                .post("logo", "v1/logo", &document_payload(&file, None))
                .await?;
            Ok(resp.detected)
        })
    }

    fn detect_signatures(&self, file: DocumentRef) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let resp: DetectionResponse = self
                .post("signature", "v1/signatures", &document_payload(&file, None))
                .await?;
            Ok(resp.detected)
        })
    }
}

impl SectionValidator for RemoteCollaborators {
    fn validate_section(&self, task: SectionTask) -> BoxFuture<'_, Result<SectionValidation>> {
        Box::pin(async move { self.post("section-validator", "v1/sections/validate", &task).await })
    }
}
