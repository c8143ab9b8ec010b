//! Font selection for PDF output
//!
//! Note text is frequently CJK, which the PDF base-14 fonts cannot show. A
//! configured font file wins; otherwise the first installed CJK-capable
//! family is used. With neither, text falls back to built-in Helvetica.

use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use once_cell::sync::Lazy;
use printpdf::font::ParsedFont;
use printpdf::{BuiltinFont, FontId, PdfDocument};

/// Families tried in order during system font discovery
const CJK_FAMILIES: [&str; 8] = [
    "SimSun",
    "SimHei",
    "Microsoft YaHei",
    "PingFang SC",
    "Noto Sans CJK SC",
    "Source Han Sans SC",
    "WenQuanYi Micro Hei",
    "Droid Sans Fallback",
];

/// Raw face data ready to be embedded
#[derive(Debug, Clone)]
pub struct FontData {
    pub name: String,
    pub bytes: Vec<u8>,
    pub index: u32,
}

#[derive(Debug, Clone)]
pub struct FontFaces {
    pub regular: FontData,
    pub bold: Option<FontData>,
}

static SYSTEM_FACES: Lazy<Option<Arc<FontFaces>>> = Lazy::new(discover_system_faces);

/// Resolve the faces used for a document, or `None` for the built-in fallback
pub fn resolve_faces(configured: Option<&Path>) -> Option<Arc<FontFaces>> {
    if let Some(path) = configured {
        match std::fs::read(path) {
            Ok(bytes) => {
                debug!("using configured PDF font {}", path.display());
                return Some(Arc::new(FontFaces {
                    regular: FontData {
                        name: path.display().to_string(),
                        bytes,
                        index: 0,
                    },
                    bold: None,
                }));
            }
            Err(e) => warn!("cannot read PDF font {}: {e}", path.display()),
        }
    }

    let faces = SYSTEM_FACES.clone();
    if faces.is_none() {
        warn!("no CJK-capable system font found, PDF text uses built-in Helvetica");
    }
    faces
}

fn discover_system_faces() -> Option<Arc<FontFaces>> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    for family in CJK_FAMILIES {
        let Some(regular) = query_face(&db, family, fontdb::Weight::NORMAL) else {
            continue;
        };
        let bold = query_face(&db, family, fontdb::Weight::BOLD)
            .filter(|bold| bold.bytes != regular.bytes || bold.index != regular.index);
        debug!("using system font '{family}' for PDF text");
        return Some(Arc::new(FontFaces { regular, bold }));
    }
    None
}

fn query_face(db: &fontdb::Database, family: &str, weight: fontdb::Weight) -> Option<FontData> {
    let id = db.query(&fontdb::Query {
        families: &[fontdb::Family::Name(family)],
        weight,
        stretch: fontdb::Stretch::Normal,
        style: fontdb::Style::Normal,
    })?;
    let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
    Some(FontData {
        name: family.to_string(),
        bytes,
        index,
    })
}

/// A font usable in page operations
#[derive(Debug, Clone)]
pub enum FontRef {
    Embedded(FontId),
    Builtin(BuiltinFont),
}

/// Regular and bold fonts registered with one document
#[derive(Debug, Clone)]
pub struct DocumentFonts {
    pub regular: FontRef,
    pub bold: FontRef,
}

impl DocumentFonts {
    pub fn builtin() -> Self {
        Self {
            regular: FontRef::Builtin(BuiltinFont::Helvetica),
            bold: FontRef::Builtin(BuiltinFont::HelveticaBold),
        }
    }

    /// Register `faces` with `doc`, falling back to built-in fonts when parsing fails
    pub fn register(doc: &mut PdfDocument, faces: Option<&FontFaces>) -> Self {
        let Some(faces) = faces else {
            return Self::builtin();
        };

        let Some(regular) = add_face(doc, &faces.regular) else {
            warn!("font '{}' could not be parsed, using built-in Helvetica", faces.regular.name);
            return Self::builtin();
        };
        let bold = faces
            .bold
            .as_ref()
            .and_then(|bold| add_face(doc, bold))
            .unwrap_or_else(|| regular.clone());

        Self {
            regular: FontRef::Embedded(regular),
            bold: FontRef::Embedded(bold),
        }
    }

    pub fn select(&self, bold: bool) -> &FontRef {
        if bold { &self.bold } else { &self.regular }
    }
}

fn add_face(doc: &mut PdfDocument, face: &FontData) -> Option<FontId> {
    let mut warnings = Vec::new();
    let parsed = ParsedFont::from_bytes(&face.bytes, face.index as usize, &mut warnings)?;
    Some(doc.add_font(&parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configured_font_falls_through() {
        // An unreadable path must not panic; discovery result depends on the host
        let _ = resolve_faces(Some(Path::new("/nonexistent/font.ttf")));
    }

    #[test]
    fn test_unparseable_font_uses_builtin() {
        let mut doc = PdfDocument::new("fonts");
        let faces = FontFaces {
            regular: FontData {
                name: "broken".to_string(),
                bytes: b"not a font".to_vec(),
                index: 0,
            },
            bold: None,
        };
        let fonts = DocumentFonts::register(&mut doc, Some(&faces));
        assert!(matches!(fonts.regular, FontRef::Builtin(BuiltinFont::Helvetica)));
        assert!(matches!(fonts.select(true), FontRef::Builtin(BuiltinFont::HelveticaBold)));
    }
}
