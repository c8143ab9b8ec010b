//! onenote-export: convert note page markup into Word and PDF documents
//!
//! This library parses the hierarchical markup of a single note page, walks it
//! in document order to produce text, table and image units, and renders
//! those units into a reflowing `.docx` document or a fixed-page PDF.

pub mod config;
pub mod content;
pub mod convert;
pub mod error;
pub mod render;

use serde::{Deserialize, Serialize};

/// Output document formats
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Word processing document (.docx)
    Docx,
    /// Fixed-page document (.pdf)
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

// Re-export commonly used types
pub use config::ExportOptions;
pub use content::{ContentNode, ContentUnit, UnitWalker, parse_markup};
pub use convert::{convert_page, convert_page_formats, sanitize_file_name};
pub use error::{ConvertError, ParseError, RenderError};
