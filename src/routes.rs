//! HTTP routes.
//!
//! - `GET /`                          liveness text
//! - `POST /generatePdf`              markdown → PDF (`/convert` is an alias)
//! - `POST /generatePdfFromHtml`      HTML fragment → PDF
//! - `POST /generateAndMergePdfParts` fetch/render parts → merged PDF

use crate::error::ServiceError;
use crate::service::{
    GeneratePdfFromHtmlRequest, GeneratePdfRequest, MergePdfPartsRequest, PublishedArtifact,
    RenderService,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const LIVENESS_MESSAGE: &str = "Markdown to PDF Converter API";
pub const UPLOADED_MESSAGE: &str = "PDF uploaded successfully";

/// Router state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RenderService>,
}

/// Success body of the PDF routes.
#[derive(Debug, Serialize)]
pub struct PdfResponse {
    pub message: String,
    pub url: String,
}

impl From<PublishedArtifact> for PdfResponse {
    fn from(artifact: PublishedArtifact) -> Self {
        Self {
            message: UPLOADED_MESSAGE.to_string(),
            url: artifact.url,
        }
    }
}

/// Builds the application router with a request body cap of `body_limit` bytes.
pub fn router(service: Arc<RenderService>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/generatePdf", post(generate_pdf))
        .route("/convert", post(generate_pdf))
        .route("/generatePdfFromHtml", post(generate_pdf_from_html))
        .route("/generateAndMergePdfParts", post(generate_and_merge_pdf_parts))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

async fn generate_pdf(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePdfRequest>, JsonRejection>,
) -> Result<Json<PdfResponse>, ServiceError> {
    let Json(request) = payload.map_err(reject)?;
    let artifact = state.service.generate_pdf(request).await?;
    Ok(Json(artifact.into()))
}

async fn generate_pdf_from_html(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePdfFromHtmlRequest>, JsonRejection>,
) -> Result<Json<PdfResponse>, ServiceError> {
    let Json(request) = payload.map_err(reject)?;
    let artifact = state.service.generate_pdf_from_html(request).await?;
    Ok(Json(artifact.into()))
}

async fn generate_and_merge_pdf_parts(
    State(state): State<AppState>,
    payload: Result<Json<MergePdfPartsRequest>, JsonRejection>,
) -> Result<Json<PdfResponse>, ServiceError> {
    let Json(request) = payload.map_err(reject)?;
    let artifact = state.service.generate_and_merge_pdf_parts(request).await?;
    Ok(Json(artifact.into()))
}

/// Unreadable bodies get the same JSON error shape as every other failure.
fn reject(rejection: JsonRejection) -> ServiceError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::TooLarge(rejection.body_text())
    } else {
        ServiceError::Validation(rejection.body_text())
    }
}
