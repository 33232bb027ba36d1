//! Preview panel: turns the rendered image into an HTML page

use crate::error::{PreviewError, Result};
use crate::render::RenderJob;
use base64::Engine;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Display surface that accepts a complete HTML document.
pub trait PreviewSurface: Send {
    fn show(&mut self, html: &str) -> Result<()>;

    /// Directories the surface may load local resources from
    fn resource_roots(&self) -> &[PathBuf];
}

/// Writes the preview to an HTML file and optionally opens it once.
pub struct HtmlFileSurface {
    path: PathBuf,
    roots: Vec<PathBuf>,
    open_browser: bool,
    opened: bool,
}

impl HtmlFileSurface {
    pub fn new(path: impl Into<PathBuf>, open_browser: bool) -> Self {
        let path = path.into();
        let roots = path.parent().map(Path::to_path_buf).into_iter().collect();
        Self {
            path,
            roots,
            open_browser,
            opened: false,
        }
    }
}

impl PreviewSurface for HtmlFileSurface {
    fn show(&mut self, html: &str) -> Result<()> {
        std::fs::write(&self.path, html)?;
        debug!("Wrote preview {}", self.path.display());

        if self.open_browser && !self.opened {
            self.opened = true;
            if let Err(e) = open::that(&self.path) {
                warn!("Could not open {}: {}", self.path.display(), e);
            }
        }
        Ok(())
    }

    fn resource_roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Minimal page embedding `png` as a data URI.
pub fn render_html(png: &[u8]) -> String {
    let data = base64::engine::general_purpose::STANDARD.encode(png);
    format!(
        "<!DOCTYPE html>\n<html>\n  <body>\n    <img src=\"data:image/png;base64,{}\">\n  </body>\n</html>\n",
        data
    )
}

pub struct PreviewPresenter {
    surface: Box<dyn PreviewSurface>,
    /// Last successfully rendered page
    content: Option<String>,
}

impl PreviewPresenter {
    pub fn new(surface: Box<dyn PreviewSurface>) -> Self {
        Self {
            surface,
            content: None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Load the job's image and replace the panel contents with it.
    pub async fn present(&mut self, job: &RenderJob) -> Result<()> {
        let image = &job.output_image_path;
        if !self.surface.resource_roots().iter().any(|root| image.starts_with(root)) {
            return Err(PreviewError::Config(format!(
                "{} is outside the preview's resource roots",
                image.display()
            )));
        }

        let bytes = tokio::fs::read(image)
            .await
            .map_err(|_| PreviewError::ArtifactMissing(image.clone()))?;

        let html = render_html(&bytes);
        self.surface.show(&html)?;
        self.content = Some(html);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn job_in(dir: &Path) -> RenderJob {
        RenderJob {
            source_path: dir.join("diagram.py"),
            output_image_path: dir.join("diagram.png"),
        }
    }

    #[test]
    fn test_render_html_embeds_base64() {
        let html = render_html(b"\x89PNG");
        assert!(html.contains("<img src=\"data:image/png;base64,iVBORw==\">"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn test_present_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let job = job_in(temp_dir.path());
        let surface = HtmlFileSurface::new(temp_dir.path().join("preview.html"), false);
        let mut presenter = PreviewPresenter::new(Box::new(surface));

        std::fs::write(&job.output_image_path, b"first").unwrap();
        presenter.present(&job).await.unwrap();
        let first = presenter.content().unwrap().to_string();

        std::fs::write(&job.output_image_path, b"second").unwrap();
        presenter.present(&job).await.unwrap();

        assert_ne!(presenter.content().unwrap(), first);
        let on_disk = std::fs::read_to_string(temp_dir.path().join("preview.html")).unwrap();
        assert_eq!(on_disk, presenter.content().unwrap());
    }

    #[tokio::test]
    async fn test_missing_artifact_keeps_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let job = job_in(temp_dir.path());
        let surface = HtmlFileSurface::new(temp_dir.path().join("preview.html"), false);
        let mut presenter = PreviewPresenter::new(Box::new(surface));

        std::fs::write(&job.output_image_path, b"ok").unwrap();
        presenter.present(&job).await.unwrap();
        std::fs::remove_file(&job.output_image_path).unwrap();

        let err = presenter.present(&job).await.unwrap_err();
        assert!(matches!(err, PreviewError::ArtifactMissing(_)));
        assert_eq!(presenter.content().unwrap(), render_html(b"ok"));
    }

    #[tokio::test]
    async fn test_rejects_image_outside_roots() {
        let temp_dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let surface = HtmlFileSurface::new(temp_dir.path().join("preview.html"), false);
        let mut presenter = PreviewPresenter::new(Box::new(surface));

        std::fs::write(other.path().join("diagram.png"), b"x").unwrap();
        let err = presenter.present(&job_in(other.path())).await.unwrap_err();
        assert!(matches!(err, PreviewError::Config(_)));
        assert!(presenter.content().is_none());
    }
}
