//! PDF output
//!
//! Units become flowables as they arrive; fonts are registered and pages laid
//! out when the document is saved. Wide tables are cut into column segments,
//! each rendered as its own table with a repeated header row.

mod fonts;
mod layout;

pub use fonts::{DocumentFonts, resolve_faces};
pub use layout::{CONTENT_HEIGHT, CONTENT_WIDTH, TableBlock};

use std::fs;
use std::io::Cursor;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{info, warn};
use printpdf::image::RawImage;
use printpdf::{Mm, PdfDocument, PdfPage, PdfSaveOptions};

use self::layout::{Align, Flowable, ImageBlock, Paginator, TextBlock};
use super::{TempImageStore, UnitRenderer};
use crate::content::{ImagePayload, TableGrid, TextUnit};
use crate::error::{ConvertError, RenderError};

const TITLE_SIZE: f32 = 18.0;
const TITLE_SPACE_AFTER: f32 = 12.0;
const BODY_SIZE: f32 = 12.0;
const BODY_SPACE_AFTER: f32 = 4.0;
const CAPTION_SIZE: f32 = 10.0;
const NOTE_SIZE: f32 = 9.0;
const INDENT_PER_LEVEL: f32 = 15.0;
const TABLE_SPACE_AFTER: f32 = 10.0;

/// Tables with at most this many columns are rendered in one piece
const SINGLE_SEGMENT_COLUMNS: usize = 8;
const MEDIUM_TABLE_COLUMNS: usize = 12;
const MEDIUM_SEGMENT_WIDTH: usize = 8;
const WIDE_SEGMENT_WIDTH: usize = 6;

pub const MAX_TABLE_ROWS: usize = 120;
pub const MAX_CELL_CHARS: usize = 300;
/// A word-boundary cut must keep more than 70% of the allowed characters
const MIN_CUT_CHARS: usize = MAX_CELL_CHARS * 7 / 10;

const POINTS_PER_INCH: f32 = 72.0;
const MAX_IMAGE_UPSCALE: f32 = 1.2;
const MIN_IMAGE_WIDTH_FRACTION: f32 = 0.7;
const FALLBACK_PIXELS: (u32, u32) = (600, 400);
const FALLBACK_IMAGE_SIZE: (f32, f32) = (5.0 * POINTS_PER_INCH, 4.0 * POINTS_PER_INCH);

pub struct PdfRenderer {
    title: String,
    flow: Vec<Flowable>,
    tables: usize,
    images: TempImageStore,
    font_path: Option<PathBuf>,
}

impl PdfRenderer {
    /// `font_path` overrides system font discovery for text
    pub fn new(font_path: Option<PathBuf>) -> Self {
        Self {
            title: String::new(),
            flow: Vec::new(),
            tables: 0,
            images: TempImageStore::new(),
            font_path,
        }
    }

    /// Keep temporary image files under `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images = TempImageStore::in_dir(dir);
        self
    }

    fn push_text(&mut self, text: &str, size: f32, bold: bool, indent: f32, space_after: f32) {
        self.flow.push(Flowable::Text(TextBlock::new(
            text,
            size,
            bold,
            indent,
            Align::Left,
            space_after,
        )));
    }

    /// Lay out one column segment, falling back to pipe-joined lines
    fn push_segment(&mut self, part: usize, rows: &[Vec<String>]) {
        match TableBlock::new(rows) {
            Ok(block) => self.flow.push(Flowable::Table(block)),
            Err(e) => {
                warn!("table {} segment {part}: {e}, rendering as text", self.tables);
                for row in rows {
                    self.push_text(&row.join(" | "), layout::BODY_FONT_SIZE, false, 0.0, 0.0);
                }
            }
        }
        self.flow.push(Flowable::Space(TABLE_SPACE_AFTER));
    }
}

impl UnitRenderer for PdfRenderer {
    fn begin(&mut self, title: &str) {
        self.title = title.to_string();
        self.flow.push(Flowable::Text(TextBlock::new(
            title,
            TITLE_SIZE,
            true,
            0.0,
            Align::Center,
            TITLE_SPACE_AFTER,
        )));
    }

    fn render_text(&mut self, unit: &TextUnit) -> Result<(), RenderError> {
        let indent = unit.indent as f32 * INDENT_PER_LEVEL;
        self.push_text(
            &unit.text,
            BODY_SIZE,
            unit.formatting.bold,
            indent,
            BODY_SPACE_AFTER,
        );
        Ok(())
    }

    fn render_table(&mut self, grid: &TableGrid) -> Result<(), RenderError> {
        self.tables += 1;
        let columns = grid.column_count();
        if columns == 0 {
            return Err(RenderError::Layout("table has no columns".to_string()));
        }

        let shown = grid.row_count().min(MAX_TABLE_ROWS);
        let rows: Vec<Vec<String>> = grid.rows()[..shown]
            .iter()
            .map(|row| row.iter().map(|cell| truncate_cell(cell)).collect())
            .collect();
        let capped = TableGrid::new(rows);

        let segments = column_segments(columns);
        for (index, range) in segments.iter().enumerate() {
            if segments.len() > 1 && columns > SINGLE_SEGMENT_COLUMNS {
                let caption = if index == 0 {
                    format!(
                        "Table {} ({columns} columns, {} parts)",
                        self.tables,
                        segments.len()
                    )
                } else {
                    format!("Continued (columns {}-{})", range.start + 1, range.end)
                };
                self.push_text(&caption, CAPTION_SIZE, true, 0.0, 4.0);
            }

            let segment = capped.column_slice(range.clone());
            self.push_segment(index + 1, segment.rows());
        }

        if grid.row_count() > MAX_TABLE_ROWS {
            let note = format!(
                "... {} more rows not shown (table has {} rows)",
                grid.row_count() - MAX_TABLE_ROWS,
                grid.row_count()
            );
            self.push_text(&note, NOTE_SIZE, false, 0.0, TABLE_SPACE_AFTER);
        }
        Ok(())
    }

    fn render_image(&mut self, payload: &ImagePayload) -> Result<(), RenderError> {
        let path = self.images.store(payload)?;
        let bytes = fs::read(&path)?;

        let decoded = image::load_from_memory(&bytes)?;
        let mut png = Cursor::new(Vec::new());
        decoded.write_to(&mut png, image::ImageFormat::Png)?;

        let mut warnings = Vec::new();
        let raw = RawImage::decode_from_bytes(png.get_ref(), &mut warnings)
            .map_err(|e| RenderError::Layout(format!("cannot embed image: {e}")))?;

        let (width, height) = pdf_image_size(payload.dimensions());
        self.flow.push(Flowable::Image(ImageBlock {
            image: raw,
            width,
            height,
        }));
        Ok(())
    }

    fn finish(&mut self, path: &Path) -> Result<(), ConvertError> {
        let mut doc = PdfDocument::new(&self.title);
        let faces = resolve_faces(self.font_path.as_deref());
        let fonts = DocumentFonts::register(&mut doc, faces.as_deref());

        let mut paginator = Paginator::new(&fonts);
        for flowable in self.flow.drain(..) {
            paginator.place(flowable, &mut doc);
        }
        for ops in paginator.finish() {
            doc.pages.push(PdfPage::new(Mm(210.0), Mm(297.0), ops));
        }

        let mut warnings = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        fs::write(path, bytes).map_err(|source| ConvertError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("wrote {}", path.display());
        Ok(())
    }

    fn cleanup(&mut self) {
        self.images.cleanup();
    }
}

/// Column ranges of the segments a table is split into
pub fn column_segments(columns: usize) -> Vec<Range<usize>> {
    if columns <= SINGLE_SEGMENT_COLUMNS {
        return vec![0..columns];
    }
    let width = if columns <= MEDIUM_TABLE_COLUMNS {
        MEDIUM_SEGMENT_WIDTH
    } else {
        WIDE_SEGMENT_WIDTH
    };
    (0..columns)
        .step_by(width)
        .map(|start| start..(start + width).min(columns))
        .collect()
}

/// Cut cell text over [`MAX_CELL_CHARS`] at a word boundary
pub fn truncate_cell(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_CELL_CHARS).collect();
    let kept = match cut.rfind(' ') {
        Some(space) if cut[..space].chars().count() > MIN_CUT_CHARS => &cut[..space],
        _ => cut.as_str(),
    };
    format!("{}...", kept.trim_end())
}

/// Display size in points for an image with the given natural pixel size
pub fn pdf_image_size(natural: Option<(u32, u32)>) -> (f32, f32) {
    let (w, h) = natural.unwrap_or(FALLBACK_PIXELS);
    let (w, h) = (w as f32, h as f32);

    let scale = (CONTENT_WIDTH / w)
        .min(CONTENT_HEIGHT / h)
        .min(MAX_IMAGE_UPSCALE);
    let (mut width, mut height) = (w * scale, h * scale);

    let min_width = CONTENT_WIDTH * MIN_IMAGE_WIDTH_FRACTION;
    if width < min_width {
        height *= min_width / width;
        width = min_width;
    }
    if width > CONTENT_WIDTH {
        height *= CONTENT_WIDTH / width;
        width = CONTENT_WIDTH;
    }
    if height > CONTENT_HEIGHT {
        width *= CONTENT_HEIGHT / height;
        height = CONTENT_HEIGHT;
    }

    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        (width, height)
    } else {
        FALLBACK_IMAGE_SIZE
    }
}
