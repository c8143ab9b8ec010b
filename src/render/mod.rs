//! Output renderers
//!
//! A renderer consumes the unit stream of one page through [`UnitRenderer`]
//! and writes a single output file. Unit failures are logged and skipped by
//! [`render_page`]; only saving can fail a page.

pub mod pdf;
pub mod word;

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::content::{ContentNode, ContentUnit, ImagePayload, TableGrid, TextUnit, UnitWalker};
use crate::error::{ConvertError, RenderError};

pub use pdf::PdfRenderer;
pub use word::WordRenderer;

/// Visitor over the units of one page
pub trait UnitRenderer {
    /// Start a document with a title block
    fn begin(&mut self, title: &str);

    fn render_text(&mut self, unit: &TextUnit) -> Result<(), RenderError>;

    fn render_table(&mut self, grid: &TableGrid) -> Result<(), RenderError>;

    fn render_image(&mut self, image: &ImagePayload) -> Result<(), RenderError>;

    /// Lay out and write the finished document to `path`
    fn finish(&mut self, path: &Path) -> Result<(), ConvertError>;

    /// Release per-page resources such as temporary image files
    fn cleanup(&mut self) {}

    fn render_unit(&mut self, unit: &ContentUnit) -> Result<(), RenderError> {
        match unit {
            ContentUnit::Text(text) => self.render_text(text),
            ContentUnit::Table(grid) => self.render_table(grid),
            ContentUnit::Image(image) => self.render_image(image),
        }
    }
}

/// Drive a renderer over a parsed page and save the result.
///
/// Every unit failure is logged and the unit dropped. Temporary files are
/// released whether or not saving succeeds.
pub fn render_page(
    renderer: &mut dyn UnitRenderer,
    root: &ContentNode,
    title: &str,
    include_images: bool,
    path: &Path,
) -> Result<(), ConvertError> {
    renderer.begin(title);

    let mut rendered = 0usize;
    let mut skipped = 0usize;
    for unit in UnitWalker::new(root, include_images) {
        match renderer.render_unit(&unit) {
            Ok(()) => rendered += 1,
            Err(e) => {
                skipped += 1;
                warn!("skipping {} unit on page '{title}': {e}", unit.kind());
            }
        }
    }
    debug!("page '{title}': {rendered} units rendered, {skipped} skipped");

    let result = renderer.finish(path);
    renderer.cleanup();
    result
}

/// Transient image files backing the images of one page
#[derive(Default)]
pub struct TempImageStore {
    files: Vec<NamedTempFile>,
    dir: Option<PathBuf>,
}

impl TempImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create files under `dir` rather than the system temp directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            files: Vec::new(),
            dir: Some(dir.into()),
        }
    }

    /// Write the payload to a new temporary file named with its format extension
    pub fn store(&mut self, image: &ImagePayload) -> Result<PathBuf, RenderError> {
        let mut builder = tempfile::Builder::new();
        builder
            .prefix("onenote-img-")
            .suffix(image.format().extension());
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(image.data())?;
        file.flush()?;
        let path = file.path().to_path_buf();
        self.files.push(file);
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Delete every stored file; failures are logged, not returned
    pub fn cleanup(&mut self) {
        for file in self.files.drain(..) {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                warn!("failed to remove temporary image {}: {e}", path.display());
            }
        }
    }
}

impl Drop for TempImageStore {
    fn drop(&mut self) {
        self.cleanup();
    }
}
