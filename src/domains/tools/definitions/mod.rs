//! Tool definitions module.
//!
//! This module exports all available tool definitions.
//! Each tool is defined in its own file for better maintainability.

pub mod common;
pub mod documents;
pub mod travel;

pub use documents::{
    GeneratePdfReportParams, GeneratePdfReportTool, GenerateSlidesParams, GenerateSlidesTool,
    GenerateSpreadsheetParams, GenerateSpreadsheetTool,
};
pub use travel::{GetWeatherTool, SearchDestinationsTool};
