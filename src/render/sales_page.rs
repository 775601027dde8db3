//! Standalone HTML sales page for one document.

use super::{paragraphs, preview};
use crate::models::Document;
use html_escape::encode_text;
use std::fmt::Write;

const PREVIEW_CHARS: usize = 180;

const STYLE: &str = r#"
    body { font-family: Georgia, 'Times New Roman', serif; margin: 0; color: #222; background: #fafafa; }
    header { background: #172a54; color: #fff; padding: 64px 24px; text-align: center; }
    header h1 { font-size: 2.6em; margin: 0 0 12px; }
    header h2 { font-weight: normal; font-style: italic; color: #f5c443; margin: 0; }
    main { max-width: 760px; margin: 0 auto; padding: 32px 24px; }
    .price-box { background: #fff; border: 2px solid #172a54; border-radius: 8px; padding: 24px; text-align: center; margin: 32px 0; }
    .price { font-size: 2.4em; font-weight: bold; color: #172a54; }
    .cta { display: inline-block; background: #f5c443; color: #172a54; padding: 14px 32px; border-radius: 4px; font-weight: bold; text-decoration: none; }
    .benefits li { margin: 8px 0; }
    .toc li { margin: 12px 0; }
    .toc p { color: #555; margin: 4px 0 0; font-size: 0.95em; }
    .guarantee { background: #eef2fb; border-left: 4px solid #172a54; padding: 16px 20px; margin: 32px 0; }
    footer { text-align: center; color: #888; font-size: 0.85em; padding: 24px; }
"#;

fn benefits(document: &Document) -> Vec<String> {
    let mut items: Vec<String> = document
        .chapters
        .iter()
        .map(|chapter| match &chapter.action_plan {
            Some(_) => format!("{} - with a step-by-step action plan", chapter.title),
            None => chapter.title.clone(),
        })
        .collect();
    items.extend(
        document
            .bonuses
            .iter()
            .map(|bonus| format!("BONUS: {}", bonus.label)),
    );
    items.push(format!(
        "{} words of practical guidance written for {}",
        document.metadata.word_count, document.metadata.target_audience
    ));
    items
}

/// Renders the marketing page. Infallible; all document text is escaped.
pub fn render_sales_page(document: &Document) -> String {
    let quote = document.quote();
    let title = encode_text(&document.title);
    let subtitle = encode_text(&document.subtitle);

    let mut html = String::new();
    // writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <header>\n<h1>{title}</h1>\n<h2>{subtitle}</h2>\n</header>\n<main>\n"
    );

    html.push_str("<section class=\"copy\">\n");
    for block in paragraphs(&document.sales_copy) {
        let _ = writeln!(html, "<p>{}</p>", encode_text(block));
    }
    html.push_str("</section>\n");

    html.push_str("<section class=\"benefits\">\n<h3>What you will get</h3>\n<ul>\n");
    for benefit in benefits(document) {
        let _ = writeln!(html, "<li>{}</li>", encode_text(&benefit));
    }
    html.push_str("</ul>\n</section>\n");

    let _ = write!(
        html,
        "<div class=\"price-box\">\n<div class=\"price\">{quote}</div>\n\
         <p>Instant download. PDF and EPUB editions included.</p>\n\
         <a class=\"cta\" href=\"#buy\">Get instant access</a>\n</div>\n"
    );

    html.push_str("<section class=\"toc\">\n<h3>Inside the book</h3>\n<ol>\n");
    for chapter in &document.chapters {
        let _ = writeln!(
            html,
            "<li><strong>{}</strong><p>{}</p></li>",
            encode_text(&chapter.title),
            encode_text(&preview(&chapter.body, PREVIEW_CHARS))
        );
    }
    html.push_str("</ol>\n</section>\n");

    html.push_str(
        "<section class=\"guarantee\">\n<h3>30-Day Money-Back Guarantee</h3>\n\
         <p>Read the book, try the action plans, and if you are not completely satisfied \
         within 30 days of purchase, ask for a refund and you will get every cent back. \
         No questions asked.</p>\n</section>\n",
    );

    let _ = write!(
        html,
        "<div class=\"price-box\" id=\"buy\">\n<div class=\"price\">{quote}</div>\n\
         <a class=\"cta\" href=\"#buy\">Yes, I want {title}</a>\n</div>\n\
         </main>\n<footer>&copy; {title}</footer>\n</body>\n</html>\n"
    );
    html
}
