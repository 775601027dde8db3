//! Zip bundle with every artifact for one or more generated products.

use super::{render_epub, render_pdf, render_sales_page};
use crate::error::RenderError;
use crate::models::Document;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Lowercase, dash-separated, ASCII-only version of `name` for file names.
pub fn slug(name: &str, fallback: &str) -> String {
    let mut result = String::new();
    let mut last_dash = false;

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !result.is_empty() {
            result.push('-');
            last_dash = true;
        }
        if result.len() >= 60 {
            break;
        }
    }

    let result = result.trim_matches('-');
    if result.is_empty() {
        fallback.to_string()
    } else {
        result.to_string()
    }
}

fn pricing_summary(document: &Document) -> String {
    let quote = document.quote();
    format!(
        "Suggested price: {quote}\nBase price: ${:.2}\nWord count: {}\nNiche: {}\nAdd-ons: {}\n",
        quote.base_price,
        document.metadata.word_count,
        document.metadata.niche,
        if document.metadata.add_ons.is_empty() {
            "none".to_string()
        } else {
            document
                .metadata
                .add_ons
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        }
    )
}

/// Renders every document and packs the results, one folder per product.
pub fn package(documents: &[Document]) -> Result<Vec<u8>, RenderError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (i, document) in documents.iter().enumerate() {
        let name = slug(&document.title, "ebook");
        let folder = format!("product_{}_{}", i + 1, name);

        let pdf = render_pdf(document)?;
        let epub = render_epub(document)?;
        let sales_page = render_sales_page(document);
        let manifest = serde_json::to_vec_pretty(document)
            .map_err(|e| RenderError::Io(std::io::Error::other(e)))?;

        let hooks = document.ad_hooks.join("\n");
        let pricing = pricing_summary(document);

        let files: [(String, &[u8]); 8] = [
            (format!("{name}.pdf"), pdf.as_slice()),
            (format!("{name}.epub"), epub.as_slice()),
            ("sales_page.html".to_string(), sales_page.as_bytes()),
            ("sales_copy.txt".to_string(), document.sales_copy.as_bytes()),
            ("cover_prompt.txt".to_string(), document.cover_prompt.as_bytes()),
            ("ad_hooks.txt".to_string(), hooks.as_bytes()),
            ("pricing.txt".to_string(), pricing.as_bytes()),
            ("document.json".to_string(), manifest.as_slice()),
        ];

        for (file, contents) in files {
            zip.start_file(format!("{folder}/{file}"), options)?;
            zip.write_all(contents)?;
        }
        tracing::debug!(product = i + 1, folder = %folder, "packed product");
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_examples() {
        assert_eq!(slug("Rich Habits: 7 Steps!", "x"), "rich-habits-7-steps");
        assert_eq!(slug("  ", "ebook"), "ebook");
        assert_eq!(slug("Caf\u{e9}--Culture", "x"), "caf-culture");
        assert!(slug(&"long ".repeat(40), "x").len() <= 60);
    }
}
