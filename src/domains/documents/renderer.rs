//! The renderer capability: structured document in, artifact bytes out.

use std::sync::Arc;

use super::error::RenderError;
use super::model::{ReportDocument, SlideDeck, SpreadsheetDocument};
use super::pdf::PdfRenderer;
use super::pptx::PptxRenderer;
use super::xlsx::XlsxRenderer;

/// Turns a structured document into the bytes of a file.
///
/// Implementations are synchronous and CPU-bound; callers run them on the
/// blocking thread pool (see [`super::ArtifactStore::render_and_store`]).
pub trait DocumentRenderer: Send + Sync {
    /// The structured description this renderer accepts.
    type Document: Send + 'static;

    /// File extension (without the dot) of the produced artifact.
    fn extension(&self) -> &'static str;

    /// Render the document.
    fn render(&self, document: &Self::Document) -> Result<Vec<u8>, RenderError>;
}

/// Shared handle to a renderer for a given document type.
pub type SharedRenderer<D> = Arc<dyn DocumentRenderer<Document = D>>;

/// The set of renderers available to tools and REST handlers.
///
/// Injected at startup so tests can substitute failing or recording renderers.
#[derive(Clone)]
pub struct Renderers {
    pub spreadsheet: SharedRenderer<SpreadsheetDocument>,
    pub report: SharedRenderer<ReportDocument>,
    pub slides: SharedRenderer<SlideDeck>,
}

impl Default for Renderers {
    fn default() -> Self {
        Self {
            spreadsheet: Arc::new(XlsxRenderer),
            report: Arc::new(PdfRenderer::default()),
            slides: Arc::new(PptxRenderer),
        }
    }
}

impl std::fmt::Debug for Renderers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderers")
            .field("spreadsheet", &self.spreadsheet.extension())
            .field("report", &self.report.extension())
            .field("slides", &self.slides.extension())
            .finish()
    }
}
