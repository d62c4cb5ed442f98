//! Markdown to PDF rendering service.
//!
//! Accepts markdown or HTML over HTTP, renders it to PDF in a headless browser,
//! uploads the result to object storage and answers with the public URL.
//!
//! ## Module Overview
//!
//! - `config`: environment-driven service configuration
//! - `routes`: axum router and request/response shapes
//! - `service`: per-request pipeline (validate → render → upload)
//! - `markdown`: GFM markdown to HTML fragment
//! - `template`: fixed HTML page skeleton around a fragment
//! - `converter`: headless Chrome sessions, scoped and rate limited
//! - `merge`: concatenation of several PDFs in order
//! - `storage`: object store client
//! - `artifact`, `job`: per-request records
//! - `error`: failure taxonomy and HTTP mapping
//! - `telemetry`: OpenTelemetry integration and structured logging
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use markdown_pdf_service::{
//!     converter::{ChromeLauncher, HtmlToPdfConverter},
//!     routes,
//!     service::RenderService,
//!     storage::SupabaseStorage,
//!     template::DocumentTemplate,
//! };
//! use secrecy::SecretString;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let timeout = Duration::from_secs(30);
//!     let converter = HtmlToPdfConverter::new(
//!         Arc::new(ChromeLauncher::new(None, timeout)),
//!         4,
//!         timeout,
//!     );
//!     let http = reqwest::Client::new();
//!     let store = SupabaseStorage::new(
//!         http.clone(),
//!         "https://project.supabase.co",
//!         SecretString::new("service-key".to_string()),
//!         "avatars",
//!     );
//!     let service = RenderService::new(DocumentTemplate::default(), converter, Arc::new(store), http);
//!
//!     let app = routes::router(Arc::new(service), 5 * 1024 * 1024);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3003").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod converter;
pub mod error;
pub mod job;
pub mod markdown;
pub mod merge;
pub mod routes;
pub mod service;
pub mod storage;
pub mod telemetry;
pub mod template;
