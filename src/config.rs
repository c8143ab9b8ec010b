//! Export configuration
//!
//! Options are read from `<config_dir>/onenote-export/config.toml` when it
//! exists. Every field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ExportFormat;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Render image units. When false, image nodes are skipped without decoding.
    pub include_images: bool,
    /// Accepted for compatibility with the exporting application; not used by the renderers.
    pub include_attachments: bool,
    pub embed_attachments: bool,
    pub attachments_output_dir: Option<PathBuf>,
    /// Font file used for PDF text before searching the system fonts.
    pub pdf_font: Option<PathBuf>,
    /// Formats produced by the command line driver.
    pub formats: Vec<ExportFormat>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            include_attachments: false,
            embed_attachments: false,
            attachments_output_dir: None,
            pdf_font: None,
            formats: vec![ExportFormat::Docx, ExportFormat::Pdf],
        }
    }
}

impl ExportOptions {
    /// Load options from the default config location, or defaults if there is no file
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(config_path) = Self::get_config_path() {
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }

        Ok(ExportOptions::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the path to the config file
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("onenote-export").join("config.toml"))
    }
}
