//! Rendered PDF artifact and its generated storage name.

use chrono::Utc;
use uuid::Uuid;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// PDF bytes produced for one request, owned by the pipeline until uploaded.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub generated_name: String,
}

impl RenderedArtifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: PDF_MIME_TYPE,
            generated_name: generate_artifact_name(),
        }
    }
}

/// Builds `output-<epoch-millis>-<token>.pdf`.
///
/// The random token keeps names unique when two requests finish in the same millisecond.
pub fn generate_artifact_name() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("output-{}-{}.pdf", Utc::now().timestamp_millis(), &token[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_name_pattern() {
        let name = generate_artifact_name();
        assert!(name.starts_with("output-"));
        assert!(name.ends_with(".pdf"));

        let stem = name.trim_start_matches("output-").trim_end_matches(".pdf");
        let (millis, token) = stem.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert_eq!(token.len(), 12);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_names_do_not_collide_within_one_tick() {
        let names: HashSet<String> = (0..1000).map(|_| generate_artifact_name()).collect();
        assert_eq!(names.len(), 1000);
    }

    #[test]
    fn test_artifact_is_pdf() {
        let artifact = RenderedArtifact::new(b"%PDF-1.7".to_vec());
        assert_eq!(artifact.mime_type, "application/pdf");
        assert_eq!(artifact.bytes.len(), 8);
        assert!(artifact.generated_name.starts_with("output-"));
    }
}
