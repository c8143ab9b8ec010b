//! Page geometry, text measurement and pagination
//!
//! Content is collected as [`Flowable`] blocks and placed top to bottom when
//! the document is saved. A block that does not fit in the space left on the
//! page moves to a new page; tables break between rows and repeat their
//! header row.

use printpdf::color::Color;
use printpdf::graphics::{LinePoint, PaintMode, Point, Polygon, PolygonRing, WindingOrder};
use printpdf::image::RawImage;
use printpdf::matrix::TextMatrix;
use printpdf::ops::Op;
use printpdf::text::TextItem;
use printpdf::xobject::{XObject, XObjectTransform};
use printpdf::{PdfDocument, Pt, Rgb, XObjectId};
use unicode_segmentation::UnicodeSegmentation;

use super::fonts::{DocumentFonts, FontRef};
use crate::error::RenderError;

pub const fn cm(value: f32) -> f32 {
    value * 72.0 / 2.54
}

/// A4 portrait, in points
pub const PAGE_WIDTH: f32 = 595.2756;
pub const PAGE_HEIGHT: f32 = 841.8898;
pub const MARGIN_X: f32 = cm(1.5);
pub const MARGIN_Y: f32 = cm(2.0);
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_X;
pub const CONTENT_HEIGHT: f32 = PAGE_HEIGHT - 2.0 * MARGIN_Y;

/// Height of the frame a table segment is shrunk to fit
pub const TABLE_FRAME_HEIGHT: f32 = PAGE_HEIGHT - cm(6.0);
/// Tables are never shrunk below this factor; taller ones flow across pages
pub const MIN_TABLE_SCALE: f32 = 0.5;

const LINE_SPACING: f32 = 1.2;
const CELL_PADDING: f32 = 3.0;
pub const HEADER_FONT_SIZE: f32 = 9.0;
pub const BODY_FONT_SIZE: f32 = 8.0;
const IMAGE_SPACE_AFTER: f32 = 6.0;

/// Approximate advance width of a character, as a fraction of the font size
fn char_width(c: char) -> f32 {
    if is_wide(c) {
        return 1.0;
    }
    match c {
        ' ' => 0.278,
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.278,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.333,
        'm' | 'w' | 'M' | 'W' | '@' => 0.833,
        'A'..='Z' => 0.667,
        '0'..='9' => 0.556,
        _ => 0.556,
    }
}

fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x2FFFD)
}

pub fn text_width(text: &str, size: f32) -> f32 {
    text.graphemes(true)
        .filter_map(|g| g.chars().next())
        .map(char_width)
        .sum::<f32>()
        * size
}

/// Break `text` into lines no wider than `max_width`.
/// Words longer than a line are split between graphemes.
pub fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut width = 0.0;

    for word in text.split_word_bounds() {
        let blank = word.trim().is_empty();
        if line.is_empty() && blank {
            continue;
        }
        let word_width = text_width(word, size);
        if width + word_width <= max_width {
            line.push_str(word);
            width += word_width;
            continue;
        }

        flush_line(&mut lines, &mut line);
        width = 0.0;
        if blank {
            continue;
        }
        if word_width <= max_width {
            line.push_str(word);
            width = word_width;
            continue;
        }
        for grapheme in word.graphemes(true) {
            let w = text_width(grapheme, size);
            if width + w > max_width && !line.is_empty() {
                flush_line(&mut lines, &mut line);
                width = 0.0;
            }
            line.push_str(grapheme);
            width += w;
        }
    }
    flush_line(&mut lines, &mut line);
    lines
}

fn flush_line(lines: &mut Vec<String>, line: &mut String) {
    let trimmed = line.trim_end();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
    line.clear();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub size: f32,
    pub bold: bool,
    pub indent: f32,
    pub align: Align,
    pub space_after: f32,
}

impl TextBlock {
    pub fn new(text: &str, size: f32, bold: bool, indent: f32, align: Align, space_after: f32) -> Self {
        let indent = indent.clamp(0.0, CONTENT_WIDTH / 2.0);
        Self {
            lines: wrap_text(text, CONTENT_WIDTH - indent, size),
            size,
            bold,
            indent,
            align,
            space_after,
        }
    }

    fn leading(&self) -> f32 {
        self.size * LINE_SPACING
    }
}

/// A table with its header row first, wrapped at natural size and scaled as a whole
#[derive(Debug, Clone)]
pub struct TableBlock {
    cells: Vec<Vec<Vec<String>>>,
    row_heights: Vec<f32>,
    column_width: f32,
    columns: usize,
    scale: f32,
}

impl TableBlock {
    pub fn new(rows: &[Vec<String>]) -> Result<Self, RenderError> {
        let columns = rows.first().map_or(0, Vec::len);
        if columns == 0 {
            return Err(RenderError::Layout("table segment has no cells".to_string()));
        }

        let column_width = CONTENT_WIDTH / columns as f32;
        let inner_width = column_width - 2.0 * CELL_PADDING;
        let mut cells = Vec::with_capacity(rows.len());
        let mut row_heights = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let size = row_font_size(index);
            let wrapped: Vec<Vec<String>> =
                row.iter().map(|cell| wrap_text(cell, inner_width, size)).collect();
            let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(0).max(1);
            row_heights.push(line_count as f32 * size * LINE_SPACING + 2.0 * CELL_PADDING);
            cells.push(wrapped);
        }

        let natural: f32 = row_heights.iter().sum();
        let scale = if natural > TABLE_FRAME_HEIGHT {
            (TABLE_FRAME_HEIGHT / natural).max(MIN_TABLE_SCALE)
        } else {
            1.0
        };

        let header = row_heights[0] * scale;
        if row_heights
            .iter()
            .skip(1)
            .any(|h| h * scale + header > CONTENT_HEIGHT)
        {
            return Err(RenderError::Layout(
                "table row is taller than a page".to_string(),
            ));
        }

        Ok(Self {
            cells,
            row_heights,
            column_width,
            columns,
            scale,
        })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn height(&self) -> f32 {
        self.row_heights.iter().sum::<f32>() * self.scale
    }

    pub fn width(&self) -> f32 {
        self.column_width * self.columns as f32 * self.scale
    }
}

fn row_font_size(index: usize) -> f32 {
    if index == 0 { HEADER_FONT_SIZE } else { BODY_FONT_SIZE }
}

pub struct ImageBlock {
    pub image: RawImage,
    pub width: f32,
    pub height: f32,
}

pub enum Flowable {
    Text(TextBlock),
    Table(TableBlock),
    Image(ImageBlock),
    Space(f32),
}

/// Places flowables onto pages and records their drawing operations
pub struct Paginator<'a> {
    fonts: &'a DocumentFonts,
    pages: Vec<Vec<Op>>,
    ops: Vec<Op>,
    cursor: f32,
}

impl<'a> Paginator<'a> {
    pub fn new(fonts: &'a DocumentFonts) -> Self {
        Self {
            fonts,
            pages: Vec::new(),
            ops: Vec::new(),
            cursor: 0.0,
        }
    }

    pub fn place(&mut self, flowable: Flowable, doc: &mut PdfDocument) {
        match flowable {
            Flowable::Text(block) => self.place_text(&block),
            Flowable::Table(block) => self.place_table(&block),
            Flowable::Image(block) => self.place_image(block, doc),
            Flowable::Space(height) => self.cursor += height,
        }
    }

    /// Operations of every page; a document always has at least one page
    pub fn finish(mut self) -> Vec<Vec<Op>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(std::mem::take(&mut self.ops));
        }
        self.pages
    }

    fn remaining(&self) -> f32 {
        CONTENT_HEIGHT - self.cursor
    }

    /// PDF y coordinate of the current cursor
    fn top(&self) -> f32 {
        PAGE_HEIGHT - MARGIN_Y - self.cursor
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.cursor = 0.0;
    }

    fn ensure(&mut self, height: f32) {
        if height > self.remaining() && self.cursor > 0.0 {
            self.new_page();
        }
    }

    fn place_text(&mut self, block: &TextBlock) {
        let leading = block.leading();
        for line in &block.lines {
            self.ensure(leading);
            let x = match block.align {
                Align::Left => MARGIN_X + block.indent,
                Align::Center => {
                    MARGIN_X + ((CONTENT_WIDTH - text_width(line, block.size)) / 2.0).max(0.0)
                }
            };
            let baseline = self.top() - block.size;
            self.ops.push(fill_color(0.0, 0.0, 0.0));
            self.write_text(line, block.size, block.bold, x, baseline);
            self.cursor += leading;
        }
        self.cursor += block.space_after;
    }

    fn place_table(&mut self, block: &TableBlock) {
        let scale = block.scale;
        let header_height = block.row_heights[0] * scale;
        let first_body = block.row_heights.get(1).map_or(0.0, |h| h * scale);
        self.ensure(header_height + first_body);
        self.draw_row(block, 0);

        for index in 1..block.cells.len() {
            let height = block.row_heights[index] * scale;
            if height > self.remaining() {
                self.new_page();
                self.draw_row(block, 0);
            }
            self.draw_row(block, index);
        }
    }

    fn draw_row(&mut self, block: &TableBlock, index: usize) {
        let scale = block.scale;
        let height = block.row_heights[index] * scale;
        let width = block.column_width * scale;
        let size = row_font_size(index) * scale;
        let top = self.top();
        let header = index == 0;

        let (background, text) = if header {
            ((0.25, 0.25, 0.25), (1.0, 1.0, 1.0))
        } else if index % 2 == 0 {
            ((0.93, 0.93, 0.93), (0.0, 0.0, 0.0))
        } else {
            ((1.0, 1.0, 1.0), (0.0, 0.0, 0.0))
        };

        for (column, lines) in block.cells[index].iter().enumerate() {
            let x = MARGIN_X + column as f32 * width;
            self.ops.push(fill_color(background.0, background.1, background.2));
            self.ops.push(Op::SetOutlineColor {
                col: rgb(0.6, 0.6, 0.6),
            });
            self.ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
            self.ops
                .push(rect(x, top - height, width, height, PaintMode::FillStroke));

            self.ops.push(fill_color(text.0, text.1, text.2));
            for (line_index, line) in lines.iter().enumerate() {
                let baseline = top
                    - CELL_PADDING * scale
                    - size
                    - line_index as f32 * size * LINE_SPACING;
                self.write_text(line, size, header, x + CELL_PADDING * scale, baseline);
            }
        }
        self.cursor += height;
    }

    fn place_image(&mut self, block: ImageBlock, doc: &mut PdfDocument) {
        self.ensure(block.height);
        let pixel_width = block.image.width.max(1) as f32;
        let pixel_height = block.image.height.max(1) as f32;
        let id = XObjectId::new();
        doc.resources
            .xobjects
            .map
            .insert(id.clone(), XObject::Image(block.image));

        let x = MARGIN_X + ((CONTENT_WIDTH - block.width) / 2.0).max(0.0);
        let transform = XObjectTransform {
            translate_x: Some(Pt(x)),
            translate_y: Some(Pt(self.top() - block.height)),
            scale_x: Some(block.width / pixel_width),
            scale_y: Some(block.height / pixel_height),
            rotate: None,
            dpi: Some(72.0),
        };
        self.ops.push(Op::UseXobject { id, transform });
        self.cursor += block.height + IMAGE_SPACE_AFTER;
    }

    fn write_text(&mut self, text: &str, size: f32, bold: bool, x: f32, y: f32) {
        let matrix = TextMatrix::Translate(Pt(x), Pt(y));
        let items = vec![TextItem::Text(text.to_string())];
        let fonts = self.fonts;
        self.ops.push(Op::StartTextSection);
        match fonts.select(bold) {
            FontRef::Embedded(font) => {
                self.ops.push(Op::SetFontSize {
                    size: Pt(size),
                    font: font.clone(),
                });
                self.ops.push(Op::SetTextMatrix { matrix });
                self.ops.push(Op::WriteText {
                    items,
                    font: font.clone(),
                });
            }
            FontRef::Builtin(font) => {
                self.ops.push(Op::SetFontSizeBuiltinFont {
                    size: Pt(size),
                    font: font.clone(),
                });
                self.ops.push(Op::SetTextMatrix { matrix });
                self.ops.push(Op::WriteTextBuiltinFont {
                    items,
                    font: font.clone(),
                });
            }
        }
        self.ops.push(Op::EndTextSection);
    }
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn fill_color(r: f32, g: f32, b: f32) -> Op {
    Op::SetFillColor { col: rgb(r, g, b) }
}

fn rect(x: f32, y: f32, width: f32, height: f32, mode: PaintMode) -> Op {
    let point = |x: f32, y: f32| LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    };
    Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    point(x, y),
                    point(x + width, y),
                    point(x + width, y + height),
                    point(x, y + height),
                ],
            }],
            mode,
            winding_order: WindingOrder::NonZero,
        },
    }
}
