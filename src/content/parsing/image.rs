//! Embedded image payload discovery
//!
//! Payloads are base64 text stored in one of several places depending on how
//! the page was exported. The first location that decodes to a plausible
//! payload wins.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use log::debug;

use super::super::models::ImagePayload;
use super::super::tree::ContentNode;

const DATA_ATTRS: [&str; 10] = [
    "data",
    "Data",
    "binaryData",
    "base64Data",
    "imageData",
    "src",
    "source",
    "content",
    "bytes",
    "binary",
];

const DATA_CHILD_HINTS: [&str; 3] = ["data", "binary", "content"];

/// Decoded payloads this small are treated as false positives
pub const MIN_PAYLOAD_BYTES: usize = 100;

/// Minimum length of a bare text run considered during the subtree scan
const MIN_SCAN_CHARS: usize = 100;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Locate and decode the image payload of an image node
pub fn extract_image(node: &ContentNode) -> Option<ImagePayload> {
    let data = from_attributes(node)
        .or_else(|| from_data_children(node))
        .or_else(|| from_subtree_scan(node));

    match data {
        Some(bytes) => Some(ImagePayload::new(bytes)),
        None => {
            debug!("image node without a usable payload");
            None
        }
    }
}

fn from_attributes(node: &ContentNode) -> Option<Vec<u8>> {
    DATA_ATTRS
        .iter()
        .filter_map(|key| node.attr(key))
        .find_map(decode_payload)
}

fn from_data_children(node: &ContentNode) -> Option<Vec<u8>> {
    node.children()
        .iter()
        .filter(|child| {
            let name = child.name().to_lowercase();
            DATA_CHILD_HINTS.iter().any(|hint| name.contains(hint))
        })
        .find_map(|child| decode_payload(&child.full_text()))
}

fn from_subtree_scan(node: &ContentNode) -> Option<Vec<u8>> {
    node.text_fragments().into_iter().find_map(|fragment| {
        let compact: String = fragment.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.len() >= MIN_SCAN_CHARS && compact.bytes().all(is_base64_byte) {
            decode_payload(&compact)
        } else {
            None
        }
    })
}

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}

/// Decode base64 text, ignoring whitespace and an optional data-URI prefix.
/// Returns `None` unless the result is larger than [`MIN_PAYLOAD_BYTES`].
pub fn decode_payload(text: &str) -> Option<Vec<u8>> {
    let text = text.trim();
    let text = match text.strip_prefix("data:") {
        Some(uri) => uri.split_once(',').map(|(_, data)| data)?,
        None => text,
    };
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    LENIENT
        .decode(compact.as_bytes())
        .ok()
        .filter(|bytes| bytes.len() > MIN_PAYLOAD_BYTES)
}
