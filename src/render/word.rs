//! Word (.docx) output
//!
//! Blocks are buffered while units arrive and assembled into a document on
//! [`UnitRenderer::finish`]. Tables wider than [`WIDE_TABLE_COLUMNS`] show a
//! preview inline and are repeated in full in a landscape section at the end.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use docx_rs::{
    AlignmentType, Docx, PageMargin, PageOrientationType, Paragraph, Pic, Run, Style, StyleType,
    Table, TableCell, TableRow, WidthType,
};
use log::{debug, info};

use super::{TempImageStore, UnitRenderer};
use crate::content::{ImagePayload, TableGrid, TextUnit};
use crate::error::{ConvertError, RenderError};

const TWIPS_PER_INCH: usize = 1440;
const EMU_PER_INCH: f32 = 914_400.0;

/// US Letter, in twips
const PAGE_WIDTH: u32 = 12240;
const PAGE_HEIGHT: u32 = 15840;
const MARGIN: usize = TWIPS_PER_INCH;
const USABLE_WIDTH: usize = PAGE_WIDTH as usize - 2 * MARGIN;
const LANDSCAPE_USABLE_WIDTH: usize = PAGE_HEIGHT as usize - 2 * MARGIN;

/// A quarter inch per list level
const INDENT_PER_LEVEL: i32 = (TWIPS_PER_INCH / 4) as i32;

/// Tables with more columns than this get a landscape continuation
pub const WIDE_TABLE_COLUMNS: usize = 12;
/// Columns shown inline for a wide table
pub const PREVIEW_COLUMNS: usize = 8;

const MAX_IMAGE_WIDTH_IN: f32 = 6.5;
const MIN_IMAGE_WIDTH_IN: f32 = 2.0;
const TALL_IMAGE_WIDTH_IN: f32 = 4.55;
const FALLBACK_IMAGE_WIDTH_IN: f32 = 4.0;
const FALLBACK_ASPECT: f32 = 0.75;

enum WordBlock {
    Paragraph(Paragraph),
    Table(Table),
}

pub struct WordRenderer {
    blocks: Vec<WordBlock>,
    continuations: Vec<(usize, TableGrid)>,
    tables: usize,
    images: TempImageStore,
}

impl Default for WordRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl WordRenderer {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            continuations: Vec::new(),
            tables: 0,
            images: TempImageStore::new(),
        }
    }

    /// Keep temporary image files under `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images = TempImageStore::in_dir(dir);
        self
    }

    fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(WordBlock::Paragraph(paragraph));
    }

    fn assemble(&mut self) -> Docx {
        let mut docx = Docx::new()
            .page_size(PAGE_WIDTH, PAGE_HEIGHT)
            .page_margin(
                PageMargin::new()
                    .top(MARGIN as i32)
                    .right(MARGIN as i32)
                    .bottom(MARGIN as i32)
                    .left(MARGIN as i32),
            )
            .add_style(
                Style::new("Heading1", StyleType::Paragraph)
                    .name("Heading 1")
                    .size(32)
                    .bold(),
            );

        for block in self.blocks.drain(..) {
            docx = match block {
                WordBlock::Paragraph(p) => docx.add_paragraph(p),
                WordBlock::Table(t) => docx.add_table(t),
            };
        }

        if self.continuations.is_empty() {
            return docx;
        }

        // Close the portrait section with a section break carrying its properties
        let portrait = docx.document.section_property.clone();
        let mut section_break = Paragraph::new();
        section_break.property.section_property = Some(portrait);
        docx = docx.add_paragraph(section_break);

        for (number, grid) in self.continuations.drain(..) {
            let caption = format!("Table {number} (full, {} columns)", grid.column_count());
            docx = docx
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text(caption).bold()))
                .add_table(build_table(&grid, LANDSCAPE_USABLE_WIDTH))
                .add_paragraph(Paragraph::new());
        }

        docx.page_size(PAGE_HEIGHT, PAGE_WIDTH)
            .page_orient(PageOrientationType::Landscape)
    }
}

impl UnitRenderer for WordRenderer {
    fn begin(&mut self, title: &str) {
        self.push_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(title))
                .style("Heading1")
                .align(AlignmentType::Center),
        );
    }

    fn render_text(&mut self, unit: &TextUnit) -> Result<(), RenderError> {
        let mut run = Run::new().add_text(&unit.text);
        if unit.formatting.bold {
            run = run.bold();
        }
        if unit.formatting.italic {
            run = run.italic();
        }
        if unit.formatting.underline {
            run = run.underline("single");
        }
        if let Some(size) = unit.formatting.font_size {
            // docx sizes are half-points
            run = run.size((size * 2.0).round() as usize);
        }

        let mut paragraph = Paragraph::new().add_run(run);
        if unit.indent > 0 {
            let level = i32::try_from(unit.indent).unwrap_or(i32::MAX);
            let left = INDENT_PER_LEVEL.saturating_mul(level);
            paragraph = paragraph.indent(Some(left), None, None, None);
        }
        self.push_paragraph(paragraph);
        Ok(())
    }

    fn render_table(&mut self, grid: &TableGrid) -> Result<(), RenderError> {
        self.tables += 1;
        let columns = grid.column_count();
        if columns == 0 {
            return Err(RenderError::Layout("table has no columns".to_string()));
        }

        if columns > WIDE_TABLE_COLUMNS {
            let preview = grid.column_slice(0..PREVIEW_COLUMNS);
            self.blocks
                .push(WordBlock::Table(build_table(&preview, USABLE_WIDTH)));
            self.push_paragraph(
                Paragraph::new().add_run(
                    Run::new()
                        .add_text(format!(
                            "Table {} has {columns} columns; the first {PREVIEW_COLUMNS} are shown here \
                             and the full table is in the landscape section at the end of the document.",
                            self.tables
                        ))
                        .italic(),
                ),
            );
            self.continuations.push((self.tables, grid.clone()));
            debug!("table {} deferred to landscape section", self.tables);
        } else {
            self.blocks
                .push(WordBlock::Table(build_table(grid, USABLE_WIDTH)));
        }

        self.push_paragraph(Paragraph::new());
        Ok(())
    }

    fn render_image(&mut self, payload: &ImagePayload) -> Result<(), RenderError> {
        let path = self.images.store(payload)?;
        let png = to_png(&fs::read(&path)?)?;

        let (width_in, height_in, pixels) = match payload.dimensions() {
            Some((w, h)) => {
                let width_in = word_image_width(w, h);
                (width_in, width_in * h as f32 / w as f32, (w, h))
            }
            None => (
                FALLBACK_IMAGE_WIDTH_IN,
                FALLBACK_IMAGE_WIDTH_IN * FALLBACK_ASPECT,
                (400, 300),
            ),
        };

        let pic = Pic::new_with_dimensions(png, pixels.0, pixels.1).size(
            (width_in * EMU_PER_INCH).round() as u32,
            (height_in * EMU_PER_INCH).round() as u32,
        );
        self.push_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)));
        self.push_paragraph(Paragraph::new());
        Ok(())
    }

    fn finish(&mut self, path: &Path) -> Result<(), ConvertError> {
        let docx = self.assemble();
        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| ConvertError::Save(e.to_string()))?;
        fs::write(path, buffer.into_inner()).map_err(|source| ConvertError::Io {
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

/// Equal-width grid table spanning `usable_width` twips
fn build_table(grid: &TableGrid, usable_width: usize) -> Table {
    let columns = grid.column_count().max(1);
    let column_width = usable_width / columns;

    let rows = grid
        .rows()
        .iter()
        .map(|row| {
            TableRow::new(
                row.iter()
                    .map(|text| {
                        TableCell::new()
                            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
                            .width(column_width, WidthType::Dxa)
                    })
                    .collect(),
            )
        })
        .collect();

    Table::new(rows).set_grid(vec![column_width; columns])
}

/// Display width in inches for an image of the given natural pixel size
pub fn word_image_width(width_px: u32, height_px: u32) -> f32 {
    let mut width = match width_px {
        0..=400 => 3.9,
        401..=800 => 5.0,
        801..=1600 => 5.85,
        _ => MAX_IMAGE_WIDTH_IN,
    };
    if width_px > 0 && height_px as f32 / width_px as f32 > 1.5 {
        width = f32::min(width, TALL_IMAGE_WIDTH_IN);
    }
    width.clamp(MIN_IMAGE_WIDTH_IN, MAX_IMAGE_WIDTH_IN)
}

/// Re-encode an image as PNG, the only picture format the document writer packs
fn to_png(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let mut png = Cursor::new(Vec::new());
    decoded.write_to(&mut png, image::ImageFormat::Png)?;
    Ok(png.into_inner())
}
