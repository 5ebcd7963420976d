//! PDF text extraction
//!
//! Pulls page text out of uploaded PDFs using lopdf.

use anyhow::{bail, Context};
use std::path::Path;
use tracing::{debug, warn};

/// Extract the text of every page, in page order
pub fn extract_text_from_pdf(path: &Path) -> anyhow::Result<String> {
    let doc = lopdf::Document::load(path)
        .with_context(|| format!("Failed to load PDF {}", path.display()))?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    if pages.is_empty() {
        bail!("PDF {} has no pages", path.display());
    }

    let mut text = String::new();
    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    let cleaned = clean_text(&text);

    debug!(
        original_len = text.len(),
        cleaned_len = cleaned.len(),
        "Text extraction complete"
    );

    Ok(cleaned)
}

/// Collapse whitespace runs and strip byte-order marks
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{FEFF}', "")
}
