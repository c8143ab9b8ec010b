//! Page content model
//!
//! This module parses page markup into a tree and reduces it to an ordered
//! stream of text, table and image units.

pub mod models;
pub mod parsing;
pub mod tree;
pub mod walker;

pub use models::*;
pub use tree::{ContentNode, MarkupNode, parse_markup};
pub use walker::UnitWalker;
