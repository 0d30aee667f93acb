//! Structured document descriptions accepted by the renderers.
//!
//! The leaf types (sheets, sections, slides) double as tool parameters, so
//! their doc comments end up in the JSON schema shown to agents.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Spreadsheet
// ============================================================================

/// A workbook made of one or more worksheets.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetDocument {
    pub sheets: Vec<SheetSpec>,
    pub header_style: HeaderStyle,
}

/// A single worksheet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SheetSpec {
    /// Name of the worksheet.
    pub name: String,

    /// Column definitions.
    pub columns: Vec<ColumnSpec>,

    /// Data rows: objects keyed by column key, positional arrays, or scalars.
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,

    /// Optional cell styling applied over ranges.
    #[serde(default)]
    pub styles: Option<Vec<CellStyle>>,
}

/// A worksheet column.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSpec {
    /// Header text shown in the first row.
    pub header: String,

    /// Key used to pick values out of object rows.
    pub key: String,

    /// Column width in characters.
    #[serde(default)]
    pub width: Option<f64>,
}

/// Styling for a cell range.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CellStyle {
    /// Cell range (e.g., 'A1:C1').
    pub range: String,

    #[serde(default)]
    pub bold: Option<bool>,

    /// Hex color code.
    #[serde(default)]
    pub color: Option<String>,

    /// Hex background color code.
    #[serde(default, rename = "bgColor")]
    pub bg_color: Option<String>,
}

/// How the header row of each sheet is decorated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Bold text on a light grey fill.
    #[default]
    Plain,
    /// White bold text on green, with columns sized to their headers.
    Branded,
}

// ============================================================================
// PDF report
// ============================================================================

/// A paginated text report.
#[derive(Debug, Clone, Default)]
pub struct ReportDocument {
    pub title: String,
    pub subtitle: Option<String>,
    pub sections: Vec<ReportSection>,
}

/// One section of a report.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportSection {
    #[serde(default)]
    pub heading: Option<String>,

    pub content: String,

    #[serde(default, rename = "type")]
    pub kind: SectionKind,

    /// Data for tables or lists.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// How a report section lays out its data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    #[default]
    Text,
    List,
    Table,
}

// ============================================================================
// Slide deck
// ============================================================================

/// A presentation: a title slide followed by content slides.
#[derive(Debug, Clone, Default)]
pub struct SlideDeck {
    pub title: String,
    pub slides: Vec<SlideSpec>,
}

/// One content slide.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlideSpec {
    pub title: String,

    /// Body text; each line becomes a paragraph.
    pub content: String,

    /// Speaker notes.
    #[serde(default)]
    pub notes: Option<String>,
}
