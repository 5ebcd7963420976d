//! Document text extraction
//!
//! Turns an uploaded file plus its declared type into plain text. PDFs are
//! read with lopdf, images go through an external OCR command when one is
//! configured, and everything else yields an empty string. Extraction never
//! fails the upload: problems are logged and produce `""`.

mod pdf;

pub use pdf::extract_text_from_pdf;

use crate::config::ExtractionConfig;
use crate::metrics::METRICS_PREFIX;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

/// Image types handed to the OCR command
pub const IMAGE_TYPES: [&str; 4] = ["jpg", "jpeg", "png", "tiff"];

/// Trait for document text extraction
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract plain text; returns `""` on any failure
    async fn extract(&self, path: &Path, file_type: &str) -> String;

    /// Name reported in logs
    fn name(&self) -> &str;
}

/// Extractor backed by lopdf and an optional OCR command
#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor {
    ocr_command: Option<String>,
}

impl DocumentProcessor {
    pub fn new(ocr_command: Option<String>) -> Self {
        Self {
            ocr_command: ocr_command.filter(|cmd| !cmd.trim().is_empty()),
        }
    }

    async fn extract_pdf(&self, path: &Path) -> anyhow::Result<String> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || extract_text_from_pdf(&path)).await?
    }

    async fn extract_image(&self, path: &Path) -> anyhow::Result<String> {
        let Some(cmd) = &self.ocr_command else {
            debug!(path = %path.display(), "No OCR command configured, skipping image");
            return Ok(String::new());
        };

        let output = Command::new(cmd)
            .arg(path)
            .arg("stdout")
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!(
                "OCR command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(pdf::clean_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[async_trait]
impl TextExtractor for DocumentProcessor {
    async fn extract(&self, path: &Path, file_type: &str) -> String {
        let file_type = file_type.to_ascii_lowercase();

        let result = match file_type.as_str() {
            "pdf" => self.extract_pdf(path).await,
            t if IMAGE_TYPES.contains(&t) => self.extract_image(path).await,
            _ => return String::new(),
        };

        match result {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    file_type = %file_type,
                    error = %e,
                    "Text extraction failed"
                );
                metrics::counter!(
                    format!("{}_extraction_failures_total", METRICS_PREFIX),
                    "file_type" => file_type
                )
                .increment(1);
                String::new()
            }
        }
    }

    fn name(&self) -> &str {
        "document-processor"
    }
}

/// Create an extractor from configuration
pub fn create_extractor(config: &ExtractionConfig) -> Arc<dyn TextExtractor> {
    Arc::new(DocumentProcessor::new(config.ocr_command.clone()))
}

/// Extractor returning fixed text, for tests
pub struct MockExtractor {
    text: String,
}

impl MockExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    async fn extract(&self, _path: &Path, _file_type: &str) -> String {
        self.text.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportData, ReportRenderer};

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_unsupported_type_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "spec.docx", b"PK\x03\x04 not really a docx");

        let extractor = DocumentProcessor::default();
        assert_eq!(extractor.extract(&path, "docx").await, "");
        assert_eq!(extractor.extract(&path, "").await, "");
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "broken.pdf", b"%PDF-1.4 truncated");

        let extractor = DocumentProcessor::default();
        assert_eq!(extractor.extract(&path, "pdf").await, "");
    }

    #[tokio::test]
    async fn test_image_without_ocr_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "scan.png", b"\x89PNG\r\n");

        let extractor = DocumentProcessor::new(Some("   ".to_string()));
        assert_eq!(extractor.extract(&path, "PNG").await, "");
    }

    #[tokio::test]
    async fn test_missing_ocr_binary_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "scan.jpg", b"\xff\xd8\xff");

        let extractor = DocumentProcessor::new(Some("/nonexistent/ocr-engine".to_string()));
        assert_eq!(extractor.extract(&path, "jpg").await, "");
    }

    #[test]
    fn test_pdf_type_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = ReportRenderer::new()
            .render(&ReportData::summary(chrono::Utc::now().date_naive()))
            .unwrap();
        let path = write(dir.path(), "report.pdf", &bytes);

        let extractor = DocumentProcessor::default();
        let upper = tokio_test::block_on(extractor.extract(&path, "PDF"));
        let lower = tokio_test::block_on(extractor.extract(&path, "pdf"));

        assert_eq!(upper, lower);
        assert!(lower.contains("Executive Summary"), "extracted: {lower}");
    }

    #[tokio::test]
    async fn test_mock_extractor() {
        let extractor = MockExtractor::new("scope of works");
        assert_eq!(extractor.extract(Path::new("x"), "pdf").await, "scope of works");
        assert_eq!(extractor.name(), "mock");
    }
}
