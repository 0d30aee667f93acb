//! Spreadsheet rendering via `rust_xlsxwriter`.

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use serde_json::Value;
use std::collections::HashSet;

use super::error::RenderError;
use super::model::{CellStyle, ColumnSpec, HeaderStyle, SheetSpec, SpreadsheetDocument};
use super::renderer::DocumentRenderer;

/// Name of the sheet emitted for a workbook with no sheets.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Style ranges larger than this only decorate cells that hold data.
const MAX_BLANK_STYLED_CELLS: u64 = 10_000;

const PLAIN_HEADER_FILL: u32 = 0xE0E0E0;
const BRANDED_HEADER_FILL: u32 = 0x217346;
const WHITE: u32 = 0xFFFFFF;

/// Renders [`SpreadsheetDocument`]s as `.xlsx` workbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxRenderer;

impl DocumentRenderer for XlsxRenderer {
    type Document = SpreadsheetDocument;

    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn render(&self, document: &SpreadsheetDocument) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();

        if document.sheets.is_empty() {
            workbook.add_worksheet().set_name(DEFAULT_SHEET_NAME)?;
        }

        for sheet in &document.sheets {
            let worksheet = workbook.add_worksheet();
            write_sheet(worksheet, sheet, document.header_style)?;
        }

        Ok(workbook.save_to_buffer()?)
    }
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &SheetSpec,
    header_style: HeaderStyle,
) -> Result<(), RenderError> {
    worksheet.set_name(&sheet.name)?;

    let styles = sheet
        .styles
        .iter()
        .flatten()
        .map(StyleRule::parse)
        .collect::<Result<Vec<_>, _>>()?;

    let mut written = HashSet::new();

    for (index, column) in sheet.columns.iter().enumerate() {
        let col = column_number(index)?;
        let look = CellLook::header(header_style).with_rules(&styles, 0, col);
        worksheet.write_string_with_format(0, col, &column.header, &look.to_format())?;
        written.insert((0, col));

        if let Some(width) = column_width(column, header_style) {
            worksheet.set_column_width(col, width)?;
        }
    }

    for (index, row) in sheet.rows.iter().enumerate() {
        let row_number = u32::try_from(index + 1)
            .map_err(|_| RenderError::invalid_input("too many rows"))?;

        for (col, value) in row_cells(row, &sheet.columns)? {
            let look = CellLook::default().with_rules(&styles, row_number, col);
            write_cell(worksheet, row_number, col, value, look)?;
            written.insert((row_number, col));
        }
    }

    // Styled ranges also decorate cells that have no data.
    for rule in &styles {
        if rule.cell_count() > MAX_BLANK_STYLED_CELLS {
            continue;
        }
        for row in rule.first_row..=rule.last_row {
            for col in rule.first_col..=rule.last_col {
                if written.contains(&(row, col)) {
                    continue;
                }
                let base = if row == 0 && usize::from(col) < sheet.columns.len() {
                    CellLook::header(header_style)
                } else {
                    CellLook::default()
                };
                let look = base.with_rules(&styles, row, col);
                worksheet.write_blank(row, col, &look.to_format())?;
            }
        }
    }

    Ok(())
}

fn column_number(index: usize) -> Result<u16, RenderError> {
    u16::try_from(index).map_err(|_| RenderError::invalid_input("too many columns"))
}

fn column_width(column: &ColumnSpec, header_style: HeaderStyle) -> Option<f64> {
    match (column.width, header_style) {
        (Some(width), _) => Some(width),
        (None, HeaderStyle::Branded) => {
            let len = column.header.chars().count();
            Some(if len < 12 { 15.0 } else { (len + 5) as f64 })
        }
        (None, HeaderStyle::Plain) => None,
    }
}

/// Pair each value of a data row with its column number.
fn row_cells<'a>(row: &'a Value, columns: &[ColumnSpec]) -> Result<Vec<(u16, &'a Value)>, RenderError> {
    match row {
        Value::Object(map) => columns
            .iter()
            .enumerate()
            .filter_map(|(index, column)| map.get(&column.key).map(|v| (index, v)))
            .map(|(index, v)| Ok((column_number(index)?, v)))
            .collect(),
        Value::Array(values) => values
            .iter()
            .enumerate()
            .map(|(index, v)| Ok((column_number(index)?, v)))
            .collect(),
        scalar => Ok(vec![(0, scalar)]),
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    look: CellLook,
) -> Result<(), RenderError> {
    let format = look.to_format();
    match value {
        Value::Null => {
            if !look.is_plain() {
                worksheet.write_blank(row, col, &format)?;
            }
        }
        Value::Bool(b) => {
            worksheet.write_boolean_with_format(row, col, *b, &format)?;
        }
        Value::Number(n) => {
            let number = n.as_f64().unwrap_or_default();
            worksheet.write_number_with_format(row, col, number, &format)?;
        }
        Value::String(s) => {
            worksheet.write_string_with_format(row, col, s, &format)?;
        }
        nested => {
            worksheet.write_string_with_format(row, col, nested.to_string(), &format)?;
        }
    }
    Ok(())
}

// ============================================================================
// Cell styling
// ============================================================================

/// Resolved visual attributes of a single cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CellLook {
    bold: bool,
    font_color: Option<u32>,
    fill: Option<u32>,
}

impl CellLook {
    fn header(style: HeaderStyle) -> Self {
        match style {
            HeaderStyle::Plain => Self {
                bold: true,
                font_color: None,
                fill: Some(PLAIN_HEADER_FILL),
            },
            HeaderStyle::Branded => Self {
                bold: true,
                font_color: Some(WHITE),
                fill: Some(BRANDED_HEADER_FILL),
            },
        }
    }

    /// Apply every rule covering the cell, later rules winning.
    fn with_rules(mut self, rules: &[StyleRule], row: u32, col: u16) -> Self {
        for rule in rules.iter().filter(|r| r.contains(row, col)) {
            if let Some(bold) = rule.bold {
                self.bold = bold;
            }
            if rule.font_color.is_some() {
                self.font_color = rule.font_color;
            }
            if rule.fill.is_some() {
                self.fill = rule.fill;
            }
        }
        self
    }

    fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    fn to_format(self) -> Format {
        let mut format = Format::new();
        if self.bold {
            format = format.set_bold();
        }
        if let Some(rgb) = self.font_color {
            format = format.set_font_color(Color::RGB(rgb));
        }
        if let Some(rgb) = self.fill {
            format = format.set_background_color(Color::RGB(rgb));
        }
        format
    }
}

/// A parsed [`CellStyle`]: zero-based inclusive bounds plus attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StyleRule {
    first_row: u32,
    first_col: u16,
    last_row: u32,
    last_col: u16,
    bold: Option<bool>,
    font_color: Option<u32>,
    fill: Option<u32>,
}

impl StyleRule {
    fn parse(style: &CellStyle) -> Result<Self, RenderError> {
        let (start, end) = match style.range.split_once(':') {
            Some((start, end)) => (start, end),
            None => (style.range.as_str(), style.range.as_str()),
        };
        let (row_a, col_a) = parse_cell_ref(start)?;
        let (row_b, col_b) = parse_cell_ref(end)?;

        Ok(Self {
            first_row: row_a.min(row_b),
            first_col: col_a.min(col_b),
            last_row: row_a.max(row_b),
            last_col: col_a.max(col_b),
            bold: style.bold,
            font_color: style.color.as_deref().map(parse_hex_color).transpose()?,
            fill: style.bg_color.as_deref().map(parse_hex_color).transpose()?,
        })
    }

    fn contains(&self, row: u32, col: u16) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    fn cell_count(&self) -> u64 {
        let rows = u64::from(self.last_row - self.first_row) + 1;
        let cols = u64::from(self.last_col - self.first_col) + 1;
        rows * cols
    }
}

/// Parse an A1-style reference (`"C7"`, `"$AB$12"`) into zero-based (row, col).
fn parse_cell_ref(reference: &str) -> Result<(u32, u16), RenderError> {
    let invalid = || RenderError::invalid_input(format!("invalid cell reference '{}'", reference));

    let cleaned: String = reference.trim().chars().filter(|c| *c != '$').collect();
    let split = cleaned
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (letters, digits) = cleaned.split_at(split);

    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        let digit = u32::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
        col = col.checked_mul(26).and_then(|v| v.checked_add(digit)).ok_or_else(invalid)?;
    }
    let col = u16::try_from(col - 1).map_err(|_| invalid())?;

    let row: u32 = digits.parse().map_err(|_| invalid())?;
    if row == 0 {
        return Err(invalid());
    }

    Ok((row - 1, col))
}

/// Parse `RRGGBB`, `#RRGGBB`, `AARRGGBB` or `RGB` into a 24-bit colour.
fn parse_hex_color(value: &str) -> Result<u32, RenderError> {
    let invalid = || RenderError::invalid_input(format!("invalid color '{}'", value));

    let hex = value.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let rgb = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex.to_string(),
        8 => hex[2..].to_string(),
        _ => return Err(invalid()),
    };
    u32::from_str_radix(&rgb, 16).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Cursor, Read};

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    fn cell_xml<'a>(sheet_xml: &'a str, cell: &str) -> &'a str {
        let start = sheet_xml
            .find(&format!("r=\"{}\"", cell))
            .unwrap_or_else(|| panic!("cell {} missing", cell));
        let end = sheet_xml[start..].find("</c>").map(|e| start + e).unwrap_or(sheet_xml.len());
        &sheet_xml[start..end]
    }

    fn sheet(value: serde_json::Value) -> SheetSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_header_bold_and_values() {
        let document = SpreadsheetDocument {
            sheets: vec![sheet(json!({
                "name": "Sheet1",
                "columns": [{ "header": "A", "key": "a" }],
                "rows": [{ "a": 1 }]
            }))],
            header_style: HeaderStyle::Plain,
        };

        let bytes = XlsxRenderer.render(&document).unwrap();
        let sheet_xml = read_part(&bytes, "xl/worksheets/sheet1.xml");
        let strings = read_part(&bytes, "xl/sharedStrings.xml");
        let styles = read_part(&bytes, "xl/styles.xml");

        assert!(strings.contains(">A</t>"));
        assert!(cell_xml(&sheet_xml, "A1").contains(" s=\""), "header cell is unstyled");
        assert!(styles.contains("<b/>"));
        assert!(cell_xml(&sheet_xml, "A2").contains("<v>1</v>"));
    }

    #[test]
    fn test_empty_workbook_has_default_sheet() {
        let bytes = XlsxRenderer.render(&SpreadsheetDocument::default()).unwrap();
        let workbook = read_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains("name=\"Sheet1\""));
    }

    #[test]
    fn test_header_only_sheet() {
        let document = SpreadsheetDocument {
            sheets: vec![sheet(json!({
                "name": "Empty",
                "columns": [{ "header": "Name", "key": "name" }],
                "rows": []
            }))],
            header_style: HeaderStyle::Branded,
        };
        let bytes = XlsxRenderer.render(&document).unwrap();
        let sheet_xml = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet_xml.contains("r=\"A1\""));
        assert!(!sheet_xml.contains("r=\"A2\""));
    }

    #[test]
    fn test_positional_and_scalar_rows() {
        let columns = vec![
            ColumnSpec { header: "X".into(), key: "x".into(), width: None },
            ColumnSpec { header: "Y".into(), key: "y".into(), width: Some(20.0) },
        ];
        let array_row = json!([1, "two"]);
        let scalar_row = json!(true);
        let object_row = json!({ "y": 3, "ignored": 4 });

        let cells = row_cells(&array_row, &columns).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1], (1, &json!("two")));

        assert_eq!(row_cells(&scalar_row, &columns).unwrap(), vec![(0, &json!(true))]);
        assert_eq!(row_cells(&object_row, &columns).unwrap(), vec![(1, &json!(3))]);
    }

    #[test]
    fn test_invalid_sheet_name_is_an_error() {
        let document = SpreadsheetDocument {
            sheets: vec![sheet(json!({ "name": "bad[name]", "columns": [] }))],
            header_style: HeaderStyle::Plain,
        };
        assert!(matches!(
            XlsxRenderer.render(&document),
            Err(RenderError::Spreadsheet(_))
        ));
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1").unwrap(), (0, 0));
        assert_eq!(parse_cell_ref("c7").unwrap(), (6, 2));
        assert_eq!(parse_cell_ref("$AB$12").unwrap(), (11, 27));
        assert!(parse_cell_ref("12").is_err());
        assert!(parse_cell_ref("A0").is_err());
        assert!(parse_cell_ref("A-1").is_err());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF0000").unwrap(), 0xFF0000);
        assert_eq!(parse_hex_color("FF217346").unwrap(), 0x217346);
        assert_eq!(parse_hex_color("fff").unwrap(), 0xFFFFFF);
        assert!(parse_hex_color("red").is_err());
        assert!(parse_hex_color("").is_err());
    }

    #[test]
    fn test_style_rules_override_header() {
        let rule = StyleRule::parse(&CellStyle {
            range: "B1:A3".into(),
            bold: Some(false),
            color: Some("#112233".into()),
            bg_color: None,
        })
        .unwrap();
        assert_eq!((rule.first_row, rule.first_col, rule.last_row, rule.last_col), (0, 0, 2, 1));
        assert_eq!(rule.cell_count(), 6);

        let look = CellLook::header(HeaderStyle::Plain).with_rules(&[rule.clone()], 0, 1);
        assert!(!look.bold);
        assert_eq!(look.font_color, Some(0x112233));
        assert_eq!(look.fill, Some(PLAIN_HEADER_FILL));

        let untouched = CellLook::default().with_rules(&[rule], 5, 5);
        assert!(untouched.is_plain());
    }

    #[test]
    fn test_styles_on_empty_cells_render() {
        let document = SpreadsheetDocument {
            sheets: vec![sheet(json!({
                "name": "Styled",
                "columns": [{ "header": "A", "key": "a" }],
                "rows": [],
                "styles": [{ "range": "A1:C2", "bgColor": "FFFF00" }]
            }))],
            header_style: HeaderStyle::Plain,
        };
        let bytes = XlsxRenderer.render(&document).unwrap();
        let sheet_xml = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet_xml.contains("r=\"C2\""));
    }
}
