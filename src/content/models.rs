//! Semantic units produced by the page walker
//!
//! A page is reduced to an ordered stream of [`ContentUnit`] values. Units are
//! consumed by a renderer as soon as they are produced and never stored.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentUnit {
    Text(TextUnit),
    Table(TableGrid),
    Image(ImagePayload),
}

impl ContentUnit {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentUnit::Text(_) => "text",
            ContentUnit::Table(_) => "table",
            ContentUnit::Image(_) => "image",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TextFormatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_size: Option<f32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextUnit {
    pub text: String,
    pub indent: u32,
    pub formatting: TextFormatting,
}

/// Rectangular grid of cell strings, first row first
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableGrid {
    rows: Vec<Vec<String>>,
}

impl TableGrid {
    /// Build a grid, right-padding short rows with empty cells
    pub fn new(mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Copy of the grid restricted to `columns`
    pub fn column_slice(&self, columns: std::ops::Range<usize>) -> TableGrid {
        let end = columns.end.min(self.column_count());
        let start = columns.start.min(end);
        TableGrid {
            rows: self
                .rows
                .iter()
                .map(|row| row[start..end].to_vec())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Ico,
    Bmp,
    Webp,
}

impl ImageFormat {
    /// Detect the format from leading signature bytes; unknown data is treated as PNG
    pub fn detect(data: &[u8]) -> ImageFormat {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            ImageFormat::Png
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            ImageFormat::Gif
        } else if data.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
            ImageFormat::Ico
        } else if data.starts_with(b"BM") {
            ImageFormat::Bmp
        } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            ImageFormat::Webp
        } else {
            ImageFormat::Png
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => ".jpg",
            ImageFormat::Png => ".png",
            ImageFormat::Gif => ".gif",
            ImageFormat::Ico => ".ico",
            ImageFormat::Bmp => ".bmp",
            ImageFormat::Webp => ".webp",
        }
    }
}

/// Decoded image bytes with the detected format and natural pixel size
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImagePayload {
    #[serde(rename = "bytes", serialize_with = "serialize_len")]
    data: Vec<u8>,
    format: ImageFormat,
    width: Option<u32>,
    height: Option<u32>,
}

impl ImagePayload {
    pub fn new(data: Vec<u8>) -> Self {
        let format = ImageFormat::detect(&data);
        let (width, height) = match probe_dimensions(&data) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };
        Self {
            data,
            format,
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Natural pixel size, when the header could be read and is non-degenerate
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn serialize_len<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(data.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_is_padded() {
        let grid = TableGrid::new(vec![
            vec!["a".to_string()],
            vec!["b".to_string(), "c".to_string(), "d".to_string()],
        ]);
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.rows()[0], vec!["a", "", ""]);
    }

    #[test]
    fn test_column_slice_clamps() {
        let grid = TableGrid::new(vec![vec!["1".into(), "2".into(), "3".into()]]);
        assert_eq!(grid.column_slice(1..8).rows()[0], vec!["2", "3"]);
        assert_eq!(grid.column_slice(5..8).column_count(), 0);
    }

    #[test]
    fn test_signature_detection() {
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::detect(b"GIF89a...."), ImageFormat::Gif);
        assert_eq!(ImageFormat::detect(b"BM\x00\x00"), ImageFormat::Bmp);
        assert_eq!(ImageFormat::detect(b"RIFF\x00\x00\x00\x00WEBPVP8 "), ImageFormat::Webp);
        assert_eq!(ImageFormat::detect(&[0x00, 0x00, 0x01, 0x00, 0x01]), ImageFormat::Ico);
        assert_eq!(ImageFormat::detect(b"plain bytes").extension(), ".png");
        // RIFF without the WEBP tag is not a webp
        assert_eq!(ImageFormat::detect(b"RIFF\x00\x00\x00\x00WAVE"), ImageFormat::Png);
    }

    #[test]
    fn test_unit_json_shape() {
        let unit = ContentUnit::Text(TextUnit {
            text: "Hello".to_string(),
            indent: 1,
            formatting: TextFormatting::default(),
        });
        let json = serde_json::to_value(&unit).expect("serializable");
        assert_eq!(json["kind"], "text");
        assert_eq!(json["indent"], 1);

        let image = ContentUnit::Image(ImagePayload::new(vec![0u8; 120]));
        let json = serde_json::to_value(&image).expect("serializable");
        assert_eq!(json["bytes"], 120);
        assert_eq!(json["format"], "png");
        assert!(json["width"].is_null());
    }
}
