//! EPUB edition of the document, for readers that prefer reflowable text.

use super::paragraphs;
use crate::error::RenderError;
use crate::models::Document;
use epub_builder::{EpubBuilder, EpubContent, ReferenceType, ZipLibrary};
use html_escape::encode_text;

const STYLESHEET: &str = "body { font-family: serif; line-height: 1.5; }\n\
h1 { color: #172a54; }\n\
.label { color: #6b6b73; font-size: 0.8em; letter-spacing: 0.1em; }\n\
.callout { background: #eef2fb; border-left: 4px solid #172a54; padding: 0.5em 1em; }\n";

fn xhtml(label: Option<&str>, title: &str, body: &str, callout: Option<&str>) -> String {
    let mut page = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\n\
         <head><link rel=\"stylesheet\" type=\"text/css\" href=\"stylesheet.css\"/></head>\n<body>\n",
    );
    if let Some(label) = label {
        page.push_str(&format!("<p class=\"label\">{}</p>\n", encode_text(label)));
    }
    page.push_str(&format!("<h1>{}</h1>\n", encode_text(title)));
    for block in paragraphs(body) {
        let lines: Vec<String> = block.lines().map(|l| encode_text(l).into_owned()).collect();
        page.push_str(&format!("<p>{}</p>\n", lines.join("<br/>")));
    }
    if let Some(callout) = callout {
        page.push_str("<div class=\"callout\">\n<h2>Action Plan</h2>\n");
        for line in callout.lines().filter(|l| !l.trim().is_empty()) {
            page.push_str(&format!("<p>{}</p>\n", encode_text(line)));
        }
        page.push_str("</div>\n");
    }
    page.push_str("</body>\n</html>\n");
    page
}

fn epub_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Epub(e.to_string())
}

/// Renders the document as an EPUB with an inline table of contents.
pub fn render_epub(document: &Document) -> Result<Vec<u8>, RenderError> {
    if document.chapters.is_empty() {
        return Err(RenderError::EmptyDocument);
    }

    let zip = ZipLibrary::new().map_err(epub_error)?;
    let mut builder = EpubBuilder::new(zip).map_err(epub_error)?;
    builder.metadata("title", document.title.as_str()).map_err(epub_error)?;
    builder.metadata("lang", "en").map_err(epub_error)?;
    builder.metadata("generator", "autobook").map_err(epub_error)?;
    builder.stylesheet(STYLESHEET.as_bytes()).map_err(epub_error)?;

    let cover = xhtml(None, &document.title, &document.subtitle, None);
    builder
        .add_content(
            EpubContent::new("cover.xhtml", cover.as_bytes())
                .title("Cover")
                .reftype(ReferenceType::Cover),
        )
        .map_err(epub_error)?;
    builder.inline_toc();

    let intro = xhtml(None, "Introduction", &document.introduction, None);
    builder
        .add_content(
            EpubContent::new("introduction.xhtml", intro.as_bytes())
                .title("Introduction")
                .reftype(ReferenceType::Preface),
        )
        .map_err(epub_error)?;

    for chapter in &document.chapters {
        let label = format!("Chapter {}", chapter.index);
        let page = xhtml(
            Some(&label),
            &chapter.title,
            &chapter.body,
            chapter.action_plan.as_deref(),
        );
        builder
            .add_content(
                EpubContent::new(format!("chapter_{:02}.xhtml", chapter.index), page.as_bytes())
                    .title(format!("{label}: {}", chapter.title))
                    .reftype(ReferenceType::Text),
            )
            .map_err(epub_error)?;
    }

    for (i, bonus) in document.bonuses.iter().enumerate() {
        let page = xhtml(Some("Bonus"), &bonus.label, &bonus.body, None);
        builder
            .add_content(
                EpubContent::new(format!("bonus_{:02}.xhtml", i + 1), page.as_bytes())
                    .title(format!("Bonus: {}", bonus.label)),
            )
            .map_err(epub_error)?;
    }

    let mut output = Vec::new();
    builder.generate(&mut output).map_err(epub_error)?;
    Ok(output)
}
