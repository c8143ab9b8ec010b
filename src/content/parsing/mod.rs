//! Extraction of text, table and image data from content nodes
//!
//! Both renderers consume the output of these functions; nothing here knows
//! about an output format.

pub mod image;
pub mod table;
pub mod text;

pub use image::{decode_payload, extract_image};
pub use table::{extract_table, row_signature};
pub use text::{clean_text, extract_formatting, extract_text, resolve_indent};
