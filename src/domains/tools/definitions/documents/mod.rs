pub mod pdf_report;
pub mod slides;
pub mod spreadsheet;

pub use pdf_report::{GeneratePdfReportParams, GeneratePdfReportTool};
pub use slides::{GenerateSlidesParams, GenerateSlidesTool};
pub use spreadsheet::{GenerateSpreadsheetParams, GenerateSpreadsheetTool};
