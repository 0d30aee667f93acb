//! PDF report rendering via `lopdf`.
//!
//! Layout is deliberately simple: the standard Type1 fonts (no embedding),
//! greedy word wrapping based on an average glyph width, and a page break
//! whenever the next line would run into the footer.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};
use serde_json::Value;

use super::error::RenderError;
use super::model::{ReportDocument, ReportSection, SectionKind};
use super::renderer::DocumentRenderer;

const LINE_SPACING: f32 = 1.3;
const FOOTER_SPACE: f32 = 30.0;
const FOOTER_Y: f32 = 30.0;
const FOOTER_SIZE: f32 = 10.0;
const TABLE_CELL_MAX: usize = 30;

/// Approximate advance of an average glyph, as a fraction of the font size.
const HELVETICA_AVG_WIDTH: f32 = 0.5;
const COURIER_WIDTH: f32 = 0.6;

type Rgb = (f32, f32, f32);

const TITLE_COLOR: Rgb = (0.102, 0.212, 0.365); // #1a365d
const SUBTITLE_COLOR: Rgb = (0.290, 0.333, 0.408); // #4a5568
const HEADING_COLOR: Rgb = (0.176, 0.216, 0.282); // #2d3748
const BODY_COLOR: Rgb = SUBTITLE_COLOR;
const RULE_COLOR: Rgb = (0.886, 0.910, 0.941); // #e2e8f0

/// Renders [`ReportDocument`]s as PDF files.
#[derive(Debug, Clone, Copy)]
pub struct PdfRenderer {
    /// Page width in points.
    pub page_width: f32,
    /// Page height in points.
    pub page_height: f32,
    /// Margin on every side in points.
    pub margin: f32,
}

impl Default for PdfRenderer {
    /// US Letter with 50pt margins.
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 50.0,
        }
    }
}

impl DocumentRenderer for PdfRenderer {
    type Document = ReportDocument;

    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
        let mut layout = Layout::new(*self);

        layout.text(&document.title, Font::Bold, 26.0, TITLE_COLOR, Align::Center);
        if let Some(subtitle) = &document.subtitle {
            layout.gap(8.0);
            layout.text(subtitle, Font::Regular, 16.0, SUBTITLE_COLOR, Align::Center);
        }
        layout.gap(24.0);
        layout.rule(RULE_COLOR);
        layout.gap(24.0);

        for section in &document.sections {
            write_section(&mut layout, section);
        }

        self.assemble(&document.title, layout.finish())
    }
}

impl PdfRenderer {
    /// Wrap page content streams into a PDF document.
    fn assemble(&self, title: &str, pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, RenderError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = lopdf::Dictionary::new();
        for font in Font::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }
        let resources_id = doc.add_object(dictionary! { "Font" => fonts });

        let mut kids = Vec::with_capacity(pages.len());
        for operations in pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(self.page_width),
                    Object::Real(self.page_height),
                ],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
            "Producer" => Object::string_literal(concat!("document_mcp_server ", env!("CARGO_PKG_VERSION"))),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

fn write_section(layout: &mut Layout, section: &ReportSection) {
    if let Some(heading) = &section.heading {
        layout.text(heading, Font::Bold, 18.0, HEADING_COLOR, Align::Left);
        layout.gap(6.0);
    }

    let data = section.data.as_ref().and_then(Value::as_array);

    match (section.kind, data) {
        (SectionKind::List, Some(items)) => {
            layout.text(&section.content, Font::Regular, 12.0, BODY_COLOR, Align::Left);
            for item in items {
                layout.bullet(&value_text(item));
            }
        }
        (SectionKind::List, None) => {
            for line in section.content.lines().filter(|l| !l.trim().is_empty()) {
                layout.bullet(line.trim());
            }
        }
        (SectionKind::Table, Some(rows)) => {
            layout.text(&section.content, Font::Regular, 12.0, BODY_COLOR, Align::Left);
            layout.gap(6.0);
            let has_header = rows.iter().any(Value::is_object);
            for (index, line) in table_lines(rows).iter().enumerate() {
                let font = if has_header && index == 0 {
                    Font::MonoBold
                } else {
                    Font::Mono
                };
                layout.text(line, font, 10.0, BODY_COLOR, Align::Left);
            }
        }
        _ => layout.text(&section.content, Font::Regular, 12.0, BODY_COLOR, Align::Left),
    }

    layout.gap(18.0);
}

/// Format table rows (arrays or objects) as space-aligned text lines.
///
/// Object rows produce a header line made of the first row's keys.
fn table_lines(rows: &[Value]) -> Vec<String> {
    let headers: Vec<String> = rows
        .iter()
        .find_map(Value::as_object)
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default();

    let mut grid: Vec<Vec<String>> = Vec::new();
    if !headers.is_empty() {
        grid.push(headers.clone());
    }
    for row in rows {
        let cells = match row {
            Value::Array(values) => values.iter().map(value_text).collect(),
            Value::Object(obj) => headers
                .iter()
                .map(|h| obj.get(h).map(value_text).unwrap_or_default())
                .collect(),
            other => vec![value_text(other)],
        };
        grid.push(cells);
    }

    let columns = grid.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            grid.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| cell.chars().count().min(TABLE_CELL_MAX))
                .max()
                .unwrap_or(0)
        })
        .collect();

    grid.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(c, cell)| {
                    let cell: String = cell.chars().take(TABLE_CELL_MAX).collect();
                    format!("{:<width$}", cell, width = widths[c])
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// Layout
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Mono,
    MonoBold,
}

impl Font {
    const ALL: [Font; 4] = [Font::Regular, Font::Bold, Font::Mono, Font::MonoBold];

    fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Mono => "F3",
            Self::MonoBold => "F4",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
            Self::Mono => "Courier",
            Self::MonoBold => "Courier-Bold",
        }
    }

    fn glyph_width(self, size: f32) -> f32 {
        match self {
            Self::Mono | Self::MonoBold => size * COURIER_WIDTH,
            _ => size * HELVETICA_AVG_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

/// Accumulates drawing operations page by page, top to bottom.
struct Layout {
    page: PdfRenderer,
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    /// Baseline cursor, in points from the bottom edge.
    y: f32,
}

impl Layout {
    fn new(page: PdfRenderer) -> Self {
        Self {
            page,
            pages: Vec::new(),
            current: Vec::new(),
            y: page.page_height - page.margin,
        }
    }

    fn usable_width(&self) -> f32 {
        self.page.page_width - 2.0 * self.page.margin
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = self.page.page_height - self.page.margin;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < self.page.margin + FOOTER_SPACE {
            self.break_page();
        }
    }

    fn gap(&mut self, points: f32) {
        self.y -= points;
    }

    fn text(&mut self, text: &str, font: Font, size: f32, color: Rgb, align: Align) {
        let max_chars = (self.usable_width() / font.glyph_width(size)).floor().max(1.0) as usize;
        for line in wrap(text, max_chars) {
            self.line(&line, font, size, color, align, 0.0);
        }
    }

    fn bullet(&mut self, text: &str) {
        let size = 12.0;
        let indent = 14.0;
        let font = Font::Regular;
        let max_chars = ((self.usable_width() - indent) / font.glyph_width(size))
            .floor()
            .max(1.0) as usize;
        for (index, line) in wrap(text, max_chars).into_iter().enumerate() {
            if index == 0 {
                self.ensure_space(size * LINE_SPACING);
                let y = self.y - size;
                self.current
                    .extend(text_ops(Font::Regular, size, BODY_COLOR, self.page.margin, y, "\u{2022}"));
            }
            self.line(&line, font, size, BODY_COLOR, Align::Left, indent);
        }
    }

    fn line(&mut self, line: &str, font: Font, size: f32, color: Rgb, align: Align, indent: f32) {
        let height = size * LINE_SPACING;
        self.ensure_space(height);
        self.y -= size;

        let x = match align {
            Align::Left => self.page.margin + indent,
            Align::Center => {
                let width = line.chars().count() as f32 * font.glyph_width(size);
                (self.page.page_width - width).max(0.0) / 2.0
            }
        };
        self.current.extend(text_ops(font, size, color, x, self.y, line));
        self.y -= height - size;
    }

    fn rule(&mut self, color: Rgb) {
        self.ensure_space(1.0);
        let left = self.page.margin;
        let right = self.page.page_width - self.page.margin;
        self.current.extend([
            Operation::new("RG", vec![Object::Real(color.0), Object::Real(color.1), Object::Real(color.2)]),
            Operation::new("w", vec![Object::Real(1.0)]),
            Operation::new("m", vec![Object::Real(left), Object::Real(self.y)]),
            Operation::new("l", vec![Object::Real(right), Object::Real(self.y)]),
            Operation::new("S", vec![]),
        ]);
    }

    /// Close the last page and stamp a footer on every page.
    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.break_page();
        }
        let width = self.page.page_width;
        for (index, page) in self.pages.iter_mut().enumerate() {
            let label = format!("Page {}", index + 1);
            let label_width = label.chars().count() as f32 * Font::Regular.glyph_width(FOOTER_SIZE);
            let x = (width - label_width) / 2.0;
            page.extend(text_ops(Font::Regular, FOOTER_SIZE, BODY_COLOR, x, FOOTER_Y, &label));
        }
        self.pages
    }
}

fn text_ops(font: Font, size: f32, color: Rgb, x: f32, y: f32, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("rg", vec![Object::Real(color.0), Object::Real(color.1), Object::Real(color.2)]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font.resource_name().as_bytes().to_vec()), Object::Real(size)],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Greedy word wrap; blank input lines are kept as empty lines.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            // Hard-split words that cannot fit on a line of their own.
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            let needed = if line.is_empty() { 0 } else { line.chars().count() + 1 };
            if needed + word.chars().count() > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }
    lines
}

/// Encode text for the standard fonts' WinAnsiEncoding.
///
/// Latin-1 maps straight through; a few common typographic characters map to
/// their WinAnsi slots; anything else becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (c as u32) < 0x100 => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(value: serde_json::Value) -> ReportSection {
        serde_json::from_value(value).unwrap()
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_render_report() {
        let document = ReportDocument {
            title: "Quarterly Report".into(),
            subtitle: Some("Q3".into()),
            sections: vec![
                section(json!({ "heading": "Summary", "content": "All good." })),
                section(json!({
                    "heading": "Items",
                    "content": "Things we shipped",
                    "type": "list",
                    "data": ["one", "two", 3]
                })),
                section(json!({
                    "content": "Numbers",
                    "type": "table",
                    "data": [{ "name": "a", "value": 1 }, { "name": "b", "value": 2 }]
                })),
            ],
        };

        let bytes = PdfRenderer::default().render(&document).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&bytes), 1);
        assert!(
            bytes.windows(b"Quarterly Report".len()).any(|w| w == b"Quarterly Report"),
            "title missing from document info"
        );
    }

    #[test]
    fn test_empty_sections_render_title_only() {
        let document = ReportDocument {
            title: "Empty".into(),
            subtitle: None,
            sections: vec![],
        };
        let bytes = PdfRenderer::default().render(&document).unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_long_content_paginates() {
        let paragraph = "lorem ipsum dolor sit amet ".repeat(40);
        let sections = (0..20)
            .map(|i| section(json!({ "heading": format!("Part {}", i), "content": paragraph })))
            .collect();
        let document = ReportDocument {
            title: "Long".into(),
            subtitle: None,
            sections,
        };
        let bytes = PdfRenderer::default().render(&document).unwrap();
        assert!(page_count(&bytes) > 1);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("a bb ccc", 4), vec!["a bb", "ccc"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("one\n\ntwo", 10), vec!["one", "", "two"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn test_table_lines_from_objects() {
        let rows = vec![json!({ "city": "Rome", "days": 3 }), json!({ "city": "Bali", "days": 10 })];
        let lines = table_lines(&rows);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("city"));
        assert!(lines[1].contains("Rome"));
        assert!(lines[2].ends_with("10"));
    }

    #[test]
    fn test_table_lines_from_arrays() {
        let rows = vec![json!(["x", 1]), json!(["longer", 22])];
        let lines = table_lines(&rows);
        assert_eq!(lines, vec!["x       1", "longer  22"]);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Café"), b"Caf\xE9".to_vec());
        assert_eq!(encode_win_ansi("\u{2022} €"), vec![0x95, b' ', 0x80]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }
}
