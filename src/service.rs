//! Request handling pipeline: validate, render, upload, report.
//!
//! Each operation runs a straight line of steps and stops at the first failure.
//! Nothing is retried and nothing is kept once the response is produced.

use crate::artifact::RenderedArtifact;
use crate::converter::HtmlToPdfConverter;
use crate::error::ServiceError;
use crate::job::{RenderJob, RenderKind};
use crate::markdown::MarkdownRenderer;
use crate::merge::merge_pdfs;
use crate::storage::ObjectStore;
use crate::telemetry;
use crate::template::DocumentTemplate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// Body of `POST /generatePdf`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratePdfRequest {
    pub markdown: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratePdfFromHtmlRequest {
    pub html: Option<String>,
    pub logo: Option<String>,
}

/// Body of `POST /generateAndMergePdfParts`; parts are merged in array order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergePdfPartsRequest {
    #[serde(rename = "pdfParts")]
    pub pdf_parts: Option<Vec<PdfPart>>,
}

/// One input of a merge: an existing PDF to download or an HTML document to render.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PdfPart {
    pub url: Option<String>,
    pub template: Option<String>,
}

enum PartSource<'a> {
    Url(&'a str),
    Template(&'a str),
}

impl PdfPart {
    fn source(&self, index: usize) -> Result<PartSource<'_>, ServiceError> {
        match (non_blank(self.url.as_deref()), non_blank(self.template.as_deref())) {
            (Some(url), None) => Ok(PartSource::Url(url)),
            (None, Some(template)) => Ok(PartSource::Template(template)),
            _ => Err(ServiceError::validation(format!(
                "pdfParts[{}] must have exactly one of url or template",
                index
            ))),
        }
    }
}

/// Where an uploaded artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub name: String,
    pub url: String,
}

/// Owns everything a request needs: markdown rendering, the page template,
/// the bounded browser pool and the object store.
///
/// Shared behind an `Arc` by every HTTP handler; it holds no per-request state.
pub struct RenderService {
    markdown: MarkdownRenderer,
    template: DocumentTemplate,
    converter: HtmlToPdfConverter,
    store: Arc<dyn ObjectStore>,
    http: reqwest::Client,
}

impl RenderService {
    /// Creates the service.
    ///
    /// # Arguments
    /// * `template` - Page skeleton wrapped around every rendered body
    /// * `converter` - Bounded HTML to PDF converter
    /// * `store` - Destination for finished PDFs
    /// * `http` - Client used to download URL parts of a merge
    pub fn new(
        template: DocumentTemplate,
        converter: HtmlToPdfConverter,
        store: Arc<dyn ObjectStore>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            markdown: MarkdownRenderer::new(),
            template,
            converter,
            store,
            http,
        }
    }

    /// Markdown → HTML → templated document → PDF → object store.
    ///
    /// # Returns
    /// The stored artifact's name and public URL. Validation fails before any
    /// rendering, so a rejected request opens no browser and uploads nothing.
    pub async fn generate_pdf(
        &self,
        request: GeneratePdfRequest,
    ) -> Result<PublishedArtifact, ServiceError> {
        let markdown = required(request.markdown.as_deref(), "Markdown content is required")?;

        let mut job = RenderJob::new(RenderKind::Markdown);
        let span = info_span!("render_job", job_id = %job.job_id, kind = %job.kind);
        let result = async {
            // Markdown → fragment → full document
            let fragment = self.markdown.render(markdown);
            let document = self.template.render(&fragment, request.logo.as_deref());
            self.render_and_publish(&mut job, document).await
        }
        .instrument(span)
        .await;

        finish(job, result)
    }

    /// Same as [`RenderService::generate_pdf`] but the body is already HTML.
    pub async fn generate_pdf_from_html(
        &self,
        request: GeneratePdfFromHtmlRequest,
    ) -> Result<PublishedArtifact, ServiceError> {
        let html = required(request.html.as_deref(), "HTML content is required")?;

        let mut job = RenderJob::new(RenderKind::Html);
        let span = info_span!("render_job", job_id = %job.job_id, kind = %job.kind);
        let document = self.template.render(html, request.logo.as_deref());
        let result = self
            .render_and_publish(&mut job, document)
            .instrument(span)
            .await;

        finish(job, result)
    }

    /// Fetches or renders every part in order, concatenates them, and uploads the result.
    ///
    /// The first failing part aborts the whole merge.
    pub async fn generate_and_merge_pdf_parts(
        &self,
        request: MergePdfPartsRequest,
    ) -> Result<PublishedArtifact, ServiceError> {
        let parts = request.pdf_parts.unwrap_or_default();
        if parts.is_empty() {
            return Err(ServiceError::validation("pdfParts must be a non-empty array"));
        }
        let sources = parts
            .iter()
            .enumerate()
            .map(|(index, part)| part.source(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut job = RenderJob::new(RenderKind::Merge).with_part_count(sources.len());
        let span = info_span!("render_job", job_id = %job.job_id, kind = %job.kind);
        let result = self.merge_and_publish(&mut job, sources).instrument(span).await;

        finish(job, result)
    }

    async fn render_and_publish(
        &self,
        job: &mut RenderJob,
        document: String,
    ) -> Result<PublishedArtifact, ServiceError> {
        job.start_rendering();
        debug!(
            free_sessions = self.converter.available_sessions(),
            "Queued for browser session"
        );
        let pdf = self
            .converter
            .convert(document)
            .await
            .map_err(ServiceError::Render)?;
        self.publish(job, pdf).await
    }

    async fn merge_and_publish(
        &self,
        job: &mut RenderJob,
        sources: Vec<PartSource<'_>>,
    ) -> Result<PublishedArtifact, ServiceError> {
        job.start_rendering();

        // Collect parts strictly in request order
        let mut buffers = Vec::with_capacity(sources.len());
        for (index, source) in sources.into_iter().enumerate() {
            let bytes = match source {
                PartSource::Url(url) => self.fetch_part(index, url).await?,
                PartSource::Template(html) => self
                    .converter
                    .convert(html.to_string())
                    .await
                    .map_err(|e| ServiceError::Merge(format!("part {}: {:#}", index, e)))?,
            };
            info!("Collected part {}: {} bytes", index, bytes.len());
            buffers.push(bytes);
        }

        // lopdf work is CPU-bound
        let merged = tokio::task::spawn_blocking(move || merge_pdfs(&buffers))
            .await
            .map_err(|e| ServiceError::Merge(format!("merge task aborted: {}", e)))?
            .map_err(|e| ServiceError::Merge(e.to_string()))?;

        self.publish(job, merged).await
    }

    async fn fetch_part(&self, index: usize, url: &str) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::Merge(format!("part {}: failed to fetch {}: {}", index, url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Merge(format!(
                "part {}: {} returned {}",
                index, url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Merge(format!("part {}: failed to read {}: {}", index, url, e)))?;
        Ok(bytes.to_vec())
    }

    async fn publish(
        &self,
        job: &mut RenderJob,
        pdf: Vec<u8>,
    ) -> Result<PublishedArtifact, ServiceError> {
        let RenderedArtifact {
            bytes,
            mime_type,
            generated_name,
        } = RenderedArtifact::new(pdf);
        job.start_uploading(&generated_name, bytes.len());

        self.store
            .upload(&generated_name, bytes, mime_type)
            .await
            .map_err(ServiceError::Upload)?;

        let url = self.store.public_url(&generated_name);
        Ok(PublishedArtifact {
            name: generated_name,
            url,
        })
    }
}

fn finish(
    mut job: RenderJob,
    result: Result<PublishedArtifact, ServiceError>,
) -> Result<PublishedArtifact, ServiceError> {
    match &result {
        Ok(_) => job.mark_complete(),
        Err(e) => job.mark_failed(e.to_string()),
    }
    telemetry::record_render_telemetry(&job);
    result
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ServiceError> {
    non_blank(value).ok_or_else(|| ServiceError::validation(message))
}
