//! On-disk storage of generated artifacts and their download URLs.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::RenderError;
use super::renderer::SharedRenderer;

/// URL path under which the exports directory is served.
pub const EXPORTS_ROUTE: &str = "/exports";

/// A file produced by a renderer and written to the exports directory.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    /// Stored file name: `<uuid>_<sanitized name>.<ext>`.
    pub filename: String,
    /// Where the file lives on disk.
    #[serde(skip)]
    pub path: PathBuf,
    /// Absolute URL the file can be downloaded from.
    pub download_url: String,
}

/// Writes rendered artifacts and computes their public URLs.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    public_base: Option<String>,
    local_base: String,
}

impl ArtifactStore {
    /// Create a store rooted at `dir`.
    ///
    /// `public_domain` (a bare host such as `app.example.com`, or a full
    /// origin) takes precedence over `http://localhost:<port>` when building
    /// download URLs.
    pub fn new(dir: impl Into<PathBuf>, public_domain: Option<&str>, port: u16) -> Self {
        let public_base = public_domain
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| {
                let d = d.trim_end_matches('/');
                if d.starts_with("http://") || d.starts_with("https://") {
                    d.to_string()
                } else {
                    format!("https://{}", d)
                }
            });

        Self {
            dir: dir.into(),
            public_base,
            local_base: format!("http://localhost:{}", port),
        }
    }

    /// Create the exports directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), RenderError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        debug!("Exports directory ready at {}", self.dir.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Base URL for download links handed out by tools.
    pub fn default_base_url(&self) -> &str {
        self.public_base.as_deref().unwrap_or(&self.local_base)
    }

    /// Base URL for download links handed out over REST.
    ///
    /// The public domain wins; otherwise the caller's `Host` header is used so
    /// that links work from wherever the UI reached the server.
    pub fn base_url_for_request(&self, host: Option<&str>, forwarded_proto: Option<&str>) -> String {
        if let Some(base) = &self.public_base {
            return base.clone();
        }
        match host.map(str::trim).filter(|h| !h.is_empty()) {
            Some(host) => {
                let scheme = forwarded_proto
                    .and_then(|p| p.split(',').next())
                    .map(str::trim)
                    .filter(|p| *p == "http" || *p == "https")
                    .unwrap_or("http");
                format!("{}://{}", scheme, host)
            }
            None => self.local_base.clone(),
        }
    }

    /// Render `document` on the blocking pool and store it under a unique name,
    /// linking it from the default base URL.
    pub async fn render_and_store<D: Send + 'static>(
        &self,
        renderer: SharedRenderer<D>,
        document: D,
        requested_name: &str,
    ) -> Result<Artifact, RenderError> {
        let base = self.default_base_url().to_string();
        self.render_and_store_at(renderer, document, requested_name, &base)
            .await
    }

    /// Same as [`Self::render_and_store`] with an explicit base URL.
    pub async fn render_and_store_at<D: Send + 'static>(
        &self,
        renderer: SharedRenderer<D>,
        document: D,
        requested_name: &str,
        base_url: &str,
    ) -> Result<Artifact, RenderError> {
        let extension = renderer.extension();
        let filename = unique_filename(requested_name, extension);

        let bytes = tokio::task::spawn_blocking(move || renderer.render(&document))
            .await
            .map_err(|e| RenderError::internal(format!("render task failed: {}", e)))??;

        let path = self.dir.join(&filename);
        tokio::fs::write(&path, &bytes).await?;

        info!("Stored {} ({} bytes)", filename, bytes.len());

        Ok(Artifact {
            download_url: format!(
                "{}{}/{}",
                base_url.trim_end_matches('/'),
                EXPORTS_ROUTE,
                filename
            ),
            filename,
            path,
        })
    }
}

/// Build a collision-resistant file name from a caller-supplied one.
pub fn unique_filename(requested: &str, extension: &str) -> String {
    format!("{}_{}.{}", Uuid::new_v4(), sanitize_filename(requested, extension), extension)
}

/// Replace anything outside `[A-Za-z0-9.]` with `_` and drop a trailing
/// `.<extension>` so it is not doubled.
pub fn sanitize_filename(requested: &str, extension: &str) -> String {
    let trimmed = requested.trim();
    let suffix = format!(".{}", extension);
    let stem = if trimmed.len() > suffix.len()
        && trimmed.is_char_boundary(trimmed.len() - suffix.len())
        && trimmed[trimmed.len() - suffix.len()..].eq_ignore_ascii_case(&suffix)
    {
        &trimmed[..trimmed.len() - suffix.len()]
    } else {
        trimmed
    };

    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}
