//! Per-request render job record used for logging and telemetry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Which pipeline a request went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    Markdown,
    Html,
    Merge,
}

impl fmt::Display for RenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderKind::Markdown => write!(f, "markdown"),
            RenderKind::Html => write!(f, "html"),
            RenderKind::Merge => write!(f, "merge"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Received,
    Rendering,
    Uploading,
    Complete,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Received => write!(f, "received"),
            JobStatus::Rendering => write!(f, "rendering"),
            JobStatus::Uploading => write!(f, "uploading"),
            JobStatus::Complete => write!(f, "complete"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle of a single HTTP render request.
///
/// Lives only for the duration of the request; nothing about it is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RenderJob {
    pub job_id: String,
    pub kind: RenderKind,
    pub status: JobStatus,
    pub part_count: usize,
    pub artifact_name: Option<String>,
    pub byte_len: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl RenderJob {
    pub fn new(kind: RenderKind) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4().to_string(),
            kind,
            status: JobStatus::Received,
            part_count: 1,
            artifact_name: None,
            byte_len: None,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    pub fn with_part_count(mut self, part_count: usize) -> Self {
        self.part_count = part_count;
        self
    }

    pub fn start_rendering(&mut self) {
        self.status = JobStatus::Rendering;
        self.updated_at = Utc::now();
    }

    pub fn start_uploading(&mut self, artifact_name: &str, byte_len: usize) {
        self.status = JobStatus::Uploading;
        self.artifact_name = Some(artifact_name.to_string());
        self.byte_len = Some(byte_len);
        self.updated_at = Utc::now();
    }

    pub fn mark_complete(&mut self) {
        self.status = JobStatus::Complete;
        self.updated_at = Utc::now();
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.updated_at = Utc::now();
        self.error = Some(error);
    }

    /// Wall-clock time from receipt to a terminal state, if one was reached.
    pub fn processing_duration_ms(&self) -> Option<i64> {
        if self.status == JobStatus::Complete || self.status == JobStatus::Failed {
            Some(self.updated_at.signed_duration_since(self.created_at).num_milliseconds())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_transitions() {
        let mut job = RenderJob::new(RenderKind::Markdown);
        assert_eq!(job.status, JobStatus::Received);
        assert!(job.processing_duration_ms().is_none());

        job.start_rendering();
        assert_eq!(job.status, JobStatus::Rendering);

        job.start_uploading("output-1.pdf", 42);
        assert_eq!(job.status, JobStatus::Uploading);
        assert_eq!(job.artifact_name.as_deref(), Some("output-1.pdf"));
        assert_eq!(job.byte_len, Some(42));
        assert!(job.processing_duration_ms().is_none());

        job.mark_complete();
        assert_eq!(job.status, JobStatus::Complete);
        assert!(job.processing_duration_ms().is_some());
    }

    #[test]
    fn test_failed_job_keeps_error() {
        let mut job = RenderJob::new(RenderKind::Merge).with_part_count(3);
        job.start_rendering();
        job.mark_failed("browser crashed".to_string());

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.part_count, 3);
        assert_eq!(job.error.as_deref(), Some("browser crashed"));
        assert!(job.processing_duration_ms().is_some());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = RenderJob::new(RenderKind::Html);
        let b = RenderJob::new(RenderKind::Html);
        assert_ne!(a.job_id, b.job_id);
    }
}
