//! Turns a finished [`Document`] into downloadable artifacts.
//!
//! Every renderer takes the document by shared reference and never changes it.
//! The sales page does not depend on the PDF and can be produced when PDF
//! rendering fails.

pub mod bundle;
pub mod epub;
pub mod pdf;
pub mod sales_page;

pub use bundle::package;
pub use epub::render_epub;
pub use pdf::render_pdf;
pub use sales_page::render_sales_page;

use crate::error::RenderError;
use crate::models::Document;

#[derive(Debug, Clone)]
pub struct RenderedArtifacts {
    pub pdf: Vec<u8>,
    pub sales_page: String,
}

pub fn render(document: &Document) -> Result<RenderedArtifacts, RenderError> {
    let sales_page = render_sales_page(document);
    let pdf = render_pdf(document)?;
    Ok(RenderedArtifacts { pdf, sales_page })
}

/// Blank-line separated blocks of `text`, trimmed, empties dropped.
pub fn paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect()
}

/// At most `max_chars` characters of `text`, cut at a word boundary.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    if let Some(space) = cut.rfind(' ') {
        cut.truncate(space);
    }
    cut.push('\u{2026}');
    cut
}
