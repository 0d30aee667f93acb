//! Document generation: structured descriptions, renderers, and artifact storage.
//!
//! Renderers are bound to existing format libraries (`rust_xlsxwriter`,
//! `lopdf`, `zip`); this module only maps the structured descriptions onto
//! them and persists the results.

pub mod artifacts;
pub mod error;
pub mod model;
pub mod pdf;
pub mod pptx;
pub mod renderer;
pub mod xlsx;

pub use artifacts::{Artifact, ArtifactStore, EXPORTS_ROUTE};
pub use error::RenderError;
pub use model::{
    CellStyle, ColumnSpec, HeaderStyle, ReportDocument, ReportSection, SectionKind, SheetSpec,
    SlideDeck, SlideSpec, SpreadsheetDocument,
};
pub use pdf::PdfRenderer;
pub use pptx::PptxRenderer;
pub use renderer::{DocumentRenderer, Renderers, SharedRenderer};
pub use xlsx::XlsxRenderer;
