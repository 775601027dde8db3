//! PDF output built directly with `lopdf`.
//!
//! Layout is a simple top-down cursor over US Letter pages using the standard
//! Helvetica faces, so no font files are embedded. Nothing here reads the
//! clock: the same document always produces the same bytes.

use super::paragraphs;
use crate::error::RenderError;
use crate::models::Document;
use chrono::Datelike;
use lopdf::content::{Content, Operation};
use lopdf::{Document as PdfDocument, Object, Stream, StringFormat, dictionary};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const BOTTOM: f32 = 72.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const CALLOUT_PADDING: f32 = 12.0;

#[derive(Clone, Copy, PartialEq)]
enum Face {
    Regular,
    Bold,
    Italic,
}

impl Face {
    fn resource(self) -> &'static [u8] {
        match self {
            Face::Regular => b"F1",
            Face::Bold => b"F2",
            Face::Italic => b"F3",
        }
    }
}

#[derive(Clone, Copy)]
struct Style {
    face: Face,
    size: f32,
    leading: f32,
    color: (f32, f32, f32),
}

const NAVY: (f32, f32, f32) = (0.09, 0.16, 0.33);
const INK: (f32, f32, f32) = (0.13, 0.13, 0.13);
const GREY: (f32, f32, f32) = (0.42, 0.42, 0.45);
const WHITE: (f32, f32, f32) = (1.0, 1.0, 1.0);
const GOLD: (f32, f32, f32) = (0.96, 0.77, 0.26);
const CALLOUT_FILL: (f32, f32, f32) = (0.93, 0.95, 0.99);

const COVER_TITLE: Style = Style { face: Face::Bold, size: 32.0, leading: 40.0, color: WHITE };
const COVER_SUBTITLE: Style = Style { face: Face::Italic, size: 16.0, leading: 22.0, color: GOLD };
const COVER_NOTE: Style = Style { face: Face::Regular, size: 11.0, leading: 16.0, color: WHITE };
const LABEL: Style = Style { face: Face::Bold, size: 11.0, leading: 18.0, color: GREY };
const HEADING: Style = Style { face: Face::Bold, size: 22.0, leading: 30.0, color: NAVY };
const BODY: Style = Style { face: Face::Regular, size: 11.0, leading: 16.0, color: INK };
const CALLOUT_TITLE: Style = Style { face: Face::Bold, size: 12.0, leading: 18.0, color: NAVY };
const CALLOUT_BODY: Style = Style { face: Face::Regular, size: 10.5, leading: 15.0, color: INK };
const LEGAL: Style = Style { face: Face::Regular, size: 9.0, leading: 13.0, color: GREY };
const FOOTER: Style = Style { face: Face::Regular, size: 9.0, leading: 12.0, color: GREY };

#[derive(Clone, Copy, PartialEq)]
enum Align {
    Left,
    Center,
}

fn num(value: f32) -> Object {
    value.into()
}

/// Helvetica advance widths, in thousandths of an em, by rough character class.
fn char_width(c: char, face: Face) -> f32 {
    let base = match c {
        ' ' | 'i' | 'j' | 'l' | '.' | ',' | ';' | ':' | '!' | '\'' | '|' => 260.0,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' | '"' => 333.0,
        'm' | 'w' | 'M' | 'W' => 833.0,
        'A'..='Z' => 667.0,
        _ => 556.0,
    };
    if face == Face::Bold { base * 1.06 } else { base }
}

fn text_width(text: &str, style: Style) -> f32 {
    text.chars().map(|c| char_width(c, style.face)).sum::<f32>() * style.size / 1000.0
}

/// Greedy word wrap. A single word wider than the line gets a line of its own.
fn wrap(text: &str, style: Style, width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && text_width(&candidate, style) > width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Maps text onto WinAnsiEncoding, the encoding of the standard fonts.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| match c {
            '\u{2018}' | '\u{2019}' => Some(b'\''),
            '\u{201C}' | '\u{201D}' => Some(b'"'),
            '\u{2026}' => Some(0x85),
            '\u{2022}' => Some(0x95),
            '\u{2013}' => Some(0x96),
            '\u{2014}' => Some(0x97),
            c if c.is_control() => None,
            c if (c as u32) < 0x80 => Some(c as u8),
            c if (0xA0..=0xFF).contains(&(c as u32)) => Some(c as u32 as u8),
            _ => Some(b'?'),
        })
        .collect()
}

struct Layout {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    cursor: f32,
    fresh: bool,
}

impl Layout {
    fn new() -> Self {
        Layout {
            pages: Vec::new(),
            ops: Vec::new(),
            cursor: PAGE_HEIGHT - MARGIN,
            fresh: true,
        }
    }

    /// Starts a new page unless the current one is still blank.
    fn page_break(&mut self) {
        if self.fresh {
            return;
        }
        self.pages.push(std::mem::take(&mut self.ops));
        self.cursor = PAGE_HEIGHT - MARGIN;
        self.fresh = true;
    }

    fn ensure(&mut self, height: f32) {
        if self.cursor - height < BOTTOM {
            self.page_break();
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: (f32, f32, f32)) {
        self.fresh = false;
        self.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![num(color.0), num(color.1), num(color.2)]),
            Operation::new("re", vec![num(x), num(y), num(width), num(height)]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn text_at(&mut self, x: f32, y: f32, style: Style, text: &str) {
        self.fresh = false;
        let (r, g, b) = style.color;
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![num(r), num(g), num(b)]),
            Operation::new(
                "Tf",
                vec![Object::Name(style.face.resource().to_vec()), num(style.size)],
            ),
            Operation::new("Td", vec![num(x), num(y)]),
            Operation::new(
                "Tj",
                vec![Object::String(win_ansi(text), StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn line(&mut self, style: Style, text: &str, align: Align, left: f32, width: f32) {
        self.ensure(style.leading);
        self.cursor -= style.leading;
        let x = match align {
            Align::Left => left,
            Align::Center => left + ((width - text_width(text, style)) / 2.0).max(0.0),
        };
        self.text_at(x, self.cursor, style, text);
    }

    /// One flow block. Line breaks inside the block are kept (lists stay lists).
    fn paragraph(&mut self, style: Style, text: &str, align: Align) {
        for source_line in text.lines() {
            for line in wrap(source_line, style, TEXT_WIDTH) {
                self.line(style, &line, align, MARGIN, TEXT_WIDTH);
            }
        }
        self.cursor -= style.leading * 0.6;
    }

    fn spacer(&mut self, height: f32) {
        self.cursor -= height;
    }

    fn heading(&mut self, label: Option<&str>, title: &str) {
        // keep the heading with at least a few body lines
        self.ensure(HEADING.leading * 2.0 + BODY.leading * 4.0);
        if let Some(label) = label {
            self.line(LABEL, label, Align::Left, MARGIN, TEXT_WIDTH);
        }
        for line in wrap(title, HEADING, TEXT_WIDTH) {
            self.line(HEADING, &line, Align::Left, MARGIN, TEXT_WIDTH);
        }
        self.spacer(BODY.leading);
    }

    /// Shaded box with a title. Splits across pages when it is taller than one.
    fn callout(&mut self, title: &str, text: &str) {
        let inner_width = TEXT_WIDTH - 2.0 * CALLOUT_PADDING;
        let mut pending: Vec<String> = text
            .lines()
            .flat_map(|line| wrap(line, CALLOUT_BODY, inner_width))
            .collect();
        let mut first = true;

        while first || !pending.is_empty() {
            let header = if first { CALLOUT_TITLE.leading } else { 0.0 };
            self.spacer(BODY.leading * 0.5);
            self.ensure(2.0 * CALLOUT_PADDING + header + CALLOUT_BODY.leading);

            let room = self.cursor - BOTTOM - 2.0 * CALLOUT_PADDING - header;
            let fits = ((room / CALLOUT_BODY.leading).floor().max(1.0) as usize).min(pending.len());
            let chunk: Vec<String> = pending.drain(..fits).collect();

            let height = 2.0 * CALLOUT_PADDING + header + chunk.len() as f32 * CALLOUT_BODY.leading;
            let top = self.cursor;
            self.fill_rect(MARGIN, top - height, TEXT_WIDTH, height, CALLOUT_FILL);
            self.fill_rect(MARGIN, top - height, 4.0, height, NAVY);

            self.cursor = top - CALLOUT_PADDING;
            if first {
                self.cursor -= CALLOUT_TITLE.leading;
                self.text_at(MARGIN + CALLOUT_PADDING, self.cursor + 4.0, CALLOUT_TITLE, title);
            }
            for line in &chunk {
                self.cursor -= CALLOUT_BODY.leading;
                self.text_at(MARGIN + CALLOUT_PADDING, self.cursor + 3.0, CALLOUT_BODY, line);
            }
            self.cursor = top - height;
            first = false;
            if !pending.is_empty() {
                self.page_break();
            }
        }
        self.spacer(BODY.leading);
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.fresh {
            self.pages.push(self.ops);
        }
        self.pages
    }
}

fn cover(layout: &mut Layout, document: &Document) {
    layout.fill_rect(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT, NAVY);
    layout.fill_rect(MARGIN, PAGE_HEIGHT - 200.0, 80.0, 4.0, GOLD);
    layout.cursor = PAGE_HEIGHT - 230.0;
    for line in wrap(&document.title, COVER_TITLE, TEXT_WIDTH) {
        layout.line(COVER_TITLE, &line, Align::Center, MARGIN, TEXT_WIDTH);
    }
    layout.spacer(COVER_SUBTITLE.leading);
    for line in wrap(&document.subtitle, COVER_SUBTITLE, TEXT_WIDTH) {
        layout.line(COVER_SUBTITLE, &line, Align::Center, MARGIN, TEXT_WIDTH);
    }
    layout.cursor = BOTTOM + 2.0 * COVER_NOTE.leading;
    let note = format!(
        "A {} for {}",
        document.metadata.book_type, document.metadata.target_audience
    );
    layout.line(COVER_NOTE, &note, Align::Center, MARGIN, TEXT_WIDTH);
    layout.page_break();
}

fn copyright(layout: &mut Layout, document: &Document) {
    let year = document.metadata.generated_at.year();
    layout.cursor = PAGE_HEIGHT / 2.0;
    let notices = [
        format!("{} - {}", document.title, document.subtitle),
        format!("Copyright \u{a9} {year}. All rights reserved."),
        "No part of this publication may be reproduced, distributed, or transmitted in any \
         form or by any means without the prior written permission of the publisher, except \
         for brief quotations in reviews."
            .to_string(),
        "This book is for informational purposes only. It is not a substitute for professional \
         advice. The author and publisher disclaim any liability arising directly or indirectly \
         from the use of this material."
            .to_string(),
    ];
    for notice in &notices {
        layout.paragraph(LEGAL, notice, Align::Left);
    }
    layout.page_break();
}

fn section(layout: &mut Layout, label: Option<&str>, title: &str, text: &str) {
    layout.heading(label, title);
    for block in paragraphs(text) {
        layout.paragraph(BODY, block, Align::Left);
    }
}

fn conclusion_text(document: &Document) -> String {
    let recap = document
        .chapters
        .iter()
        .map(|chapter| format!("{}. {}", chapter.index, chapter.title))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You have reached the end of {title}, but this is where the real work begins.\n\n\
         Here is the path you just walked:\n{recap}\n\n\
         Pick one action plan and start it today. Small, consistent steps compound faster \
         than you expect. Come back to these pages whenever you need a reset, and share \
         what you have learned with someone who needs it.",
        title = document.title
    )
}

fn layout_document(document: &Document) -> Vec<Vec<Operation>> {
    let mut layout = Layout::new();

    cover(&mut layout, document);
    copyright(&mut layout, document);

    section(&mut layout, None, "Introduction", &document.introduction);
    layout.page_break();

    for chapter in &document.chapters {
        let label = format!("CHAPTER {}", chapter.index);
        section(&mut layout, Some(&label), &chapter.title, &chapter.body);
        if let Some(plan) = &chapter.action_plan {
            layout.callout("Action Plan", plan);
        }
        // explicit break so a call-out never shares a page with the next heading
        layout.page_break();
    }

    for bonus in &document.bonuses {
        section(&mut layout, Some("BONUS"), &bonus.label, &bonus.body);
        layout.page_break();
    }

    section(&mut layout, None, "Conclusion", &conclusion_text(document));
    layout.finish()
}

fn footer(page_number: usize) -> Vec<Operation> {
    let mut layout = Layout::new();
    let text = page_number.to_string();
    let x = (PAGE_WIDTH - text_width(&text, FOOTER)) / 2.0;
    layout.text_at(x, BOTTOM / 2.0, FOOTER, &text);
    layout.ops
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Renders the document as PDF bytes.
pub fn render_pdf(document: &Document) -> Result<Vec<u8>, RenderError> {
    if document.chapters.is_empty() {
        return Err(RenderError::EmptyDocument);
    }

    let pages = layout_document(document);
    tracing::debug!(pages = pages.len(), "laid out PDF");

    let mut pdf = PdfDocument::with_version("1.5");
    let pages_id = pdf.new_object_id();

    let regular = pdf.add_object(font("Helvetica"));
    let bold = pdf.add_object(font("Helvetica-Bold"));
    let italic = pdf.add_object(font("Helvetica-Oblique"));
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
            "F3" => italic,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (i, mut operations) in pages.into_iter().enumerate() {
        // the cover carries no page number
        if i > 0 {
            operations.extend(footer(i + 1));
        }
        let content = Content { operations };
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                num(PAGE_WIDTH),
                num(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = pdf.add_object(dictionary! {
        "Title" => Object::String(win_ansi(&document.title), StringFormat::Literal),
        "Subject" => Object::String(win_ansi(&document.subtitle), StringFormat::Literal),
        "Producer" => Object::string_literal("autobook"),
    });
    pdf.trailer.set("Root", catalog_id);
    pdf.trailer.set("Info", info_id);
    pdf.compress();

    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes)?;
    Ok(bytes)
}
