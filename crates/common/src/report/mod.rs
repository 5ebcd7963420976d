//! PDF report rendering
//!
//! Builds the one-page summary report served by the reports endpoint.

use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// US letter, in points
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;

const TITLE: &str = "Tender Management Report";
const HEADING: &str = "Executive Summary";
const SUMMARY: &str = "This report provides a comprehensive overview of your tender management \
activities. Key metrics include bid success rates, profit margins, and risk assessments.";

const TITLE_SIZE: i64 = 24;
const HEADING_SIZE: i64 = 18;
const BODY_SIZE: i64 = 11;
const BODY_LEADING: i64 = 14;

/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_WIDTH: f64 = 0.5;

/// Inputs for one report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportData {
    /// Requested report kind; accepted but does not change the content yet
    pub report_type: String,
    pub generated_on: NaiveDate,
}

impl ReportData {
    pub fn new(report_type: impl Into<String>, generated_on: NaiveDate) -> Self {
        Self {
            report_type: report_type.into(),
            generated_on,
        }
    }

    pub fn summary(generated_on: NaiveDate) -> Self {
        Self::new("summary", generated_on)
    }

    /// Download name, e.g. `tender_report_20240131.pdf`
    pub fn filename(&self) -> String {
        format!("tender_report_{}.pdf", self.generated_on.format("%Y%m%d"))
    }
}

/// Renders reports with lopdf
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a report into PDF bytes
    pub fn render(&self, data: &ReportData) -> Result<Vec<u8>> {
        tracing::debug!(report_type = %data.report_type, "Rendering report");

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
                "F2" => bold_id,
            },
        });

        let content = Content {
            operations: page_operations(),
        };
        let encoded = content.encode().map_err(|e| AppError::Internal {
            message: format!("Failed to encode report content: {}", e),
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(|e| AppError::Internal {
            message: format!("Failed to write report: {}", e),
        })?;

        Ok(buffer)
    }
}

fn page_operations() -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    let title_width = text_width(TITLE, TITLE_SIZE);
    let title_x = (PAGE_WIDTH - title_width) / 2;
    push_line(&mut ops, "F2", TITLE_SIZE, title_x, y, TITLE);

    y -= TITLE_SIZE + 12 + HEADING_SIZE;
    push_line(&mut ops, "F2", HEADING_SIZE, MARGIN, y, HEADING);

    y -= HEADING_SIZE;
    let max_chars = usize::try_from((PAGE_WIDTH - 2 * MARGIN) * 2 / BODY_SIZE).unwrap_or(80);
    for line in wrap_text(SUMMARY, max_chars) {
        y -= BODY_LEADING;
        push_line(&mut ops, "F1", BODY_SIZE, MARGIN, y, &line);
    }

    ops
}

fn push_line(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    ops.push(Operation::new("ET", vec![]));
}

/// Approximate rendered width in points
fn text_width(text: &str, size: i64) -> i64 {
    (text.chars().count() as f64 * size as f64 * AVG_GLYPH_WIDTH) as i64
}

/// Greedy word wrap; a word longer than `max_chars` gets its own line
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
