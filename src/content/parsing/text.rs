//! Text cleaning, indentation and style extraction
//!
//! [`clean_text`] is the single normalization routine used for paragraph
//! text and table cells alike.

use once_cell::sync::Lazy;
use regex::Regex;

use super::super::models::{TextFormatting, TextUnit};
use super::super::tree::ContentNode;

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static WHOLE_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^\s*<span\s+style\s*=\s*["']([^"']*)["']\s*>(.*)</span>\s*$"#).unwrap()
});
static FONT_SIZE_CSS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)font-size\s*:\s*([0-9]+(?:\.[0-9]+)?)\s*pt").unwrap());

/// Clean raw node text: unescape entities, strip inline tags, normalize
/// punctuation glyphs and collapse whitespace.
pub fn clean_text(raw: &str) -> String {
    let unescaped = unescape_html(raw);
    let stripped = TAG.replace_all(&unescaped, "");
    let normalized: String = stripped.chars().map(normalize_glyph).collect();
    WHITESPACE.replace_all(&normalized, " ").trim().to_string()
}

fn normalize_glyph(c: char) -> char {
    match c {
        '\u{2013}' => '-',
        '\u{201C}' | '\u{201D}' => '"',
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{25E6}' | '\u{25AA}' | '\u{25CF}' => '\u{2022}',
        '\u{00A0}' => ' ',
        other => other,
    }
}

fn unescape_html(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    ENTITY
        .replace_all(raw, |caps: &regex::Captures| {
            let entity = &caps[1];
            decode_entity(entity).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(entity: &str) -> Option<String> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from);
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from);
    }
    let named = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{00A0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "bull" => "\u{2022}",
        "hellip" => "\u{2026}",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "trade" => "\u{2122}",
        "deg" => "\u{00B0}",
        "middot" => "\u{00B7}",
        "times" => "\u{00D7}",
        "divide" => "\u{00F7}",
        "euro" => "\u{20AC}",
        "pound" => "\u{00A3}",
        "yen" => "\u{00A5}",
        "cent" => "\u{00A2}",
        "sect" => "\u{00A7}",
        "para" => "\u{00B6}",
        "laquo" => "\u{00AB}",
        "raquo" => "\u{00BB}",
        _ => return None,
    };
    Some(named.to_string())
}

/// Extract a text unit from a text-bearing node. `ancestors` runs from the
/// root down to the node's parent.
pub fn extract_text(node: &ContentNode, ancestors: &[&ContentNode]) -> Option<TextUnit> {
    let raw = node.full_text();
    let text = clean_text(&raw);
    if text.is_empty() {
        return None;
    }

    Some(TextUnit {
        text,
        indent: resolve_indent(ancestors),
        formatting: extract_formatting(node, &raw),
    })
}

/// Indent level from the nearest list container above the node
pub fn resolve_indent(ancestors: &[&ContentNode]) -> u32 {
    ancestors
        .iter()
        .rev()
        .find_map(|node| {
            if node.name() == "List" {
                Some(*node)
            } else {
                node.children().iter().find(|c| c.name() == "List")
            }
        })
        .and_then(|list| list.attr("indent"))
        .map(parse_indent)
        .unwrap_or(0)
}

fn parse_indent(value: &str) -> u32 {
    match value.trim().parse::<f64>() {
        Ok(level) if level.is_finite() && level > 0.0 => level.floor() as u32,
        _ => 0,
    }
}

/// Style flags from attributes, the tag name, and inline CSS
pub fn extract_formatting(node: &ContentNode, raw: &str) -> TextFormatting {
    let mut formatting = TextFormatting::default();
    let tag = node.name().to_lowercase();

    formatting.bold = attr_is_true(node, "bold") || tag.contains("bold");
    formatting.italic = attr_is_true(node, "italic") || tag.contains("italic");
    formatting.underline = attr_is_true(node, "underline") || tag.contains("underline");
    formatting.font_size = node.attr("fontSize").and_then(parse_font_size);

    if let Some(style) = node.attr("style") {
        apply_css(&mut formatting, style);
    }
    // A span wrapping the entire text styles the whole paragraph
    if let Some(caps) = WHOLE_SPAN.captures(raw) {
        if !caps[2].to_lowercase().contains("<span") {
            apply_css(&mut formatting, &caps[1]);
        }
    }

    formatting
}

fn attr_is_true(node: &ContentNode, key: &str) -> bool {
    node.attr(key)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn parse_font_size(value: &str) -> Option<f32> {
    value
        .trim()
        .trim_end_matches("pt")
        .parse::<f32>()
        .ok()
        .filter(|size| size.is_finite() && *size > 0.0)
}

fn apply_css(formatting: &mut TextFormatting, css: &str) {
    for declaration in css.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_lowercase();
        let value = value.trim().to_lowercase();
        match property.as_str() {
            "font-weight" => {
                if value == "bold" || value.parse::<u32>().is_ok_and(|w| w >= 600) {
                    formatting.bold = true;
                }
            }
            "font-style" if value == "italic" => formatting.italic = true,
            "text-decoration" if value.contains("underline") => formatting.underline = true,
            _ => {}
        }
    }
    if let Some(caps) = FONT_SIZE_CSS.captures(css) {
        if let Some(size) = parse_font_size(&caps[1]) {
            formatting.font_size = Some(size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::tree::parse_markup;

    #[test]
    fn test_clean_text_unescapes_then_strips() {
        assert_eq!(clean_text("&lt;b&gt;Hi&lt;/b&gt;"), "Hi");
        assert_eq!(clean_text("<span style='x'>A</span>  &amp;\n B"), "A & B");
        assert_eq!(clean_text("caf&#233; &#x41;"), "café A");
        assert_eq!(clean_text("&unknown; stays"), "&unknown; stays");
    }

    #[test]
    fn test_clean_text_normalizes_glyphs() {
        assert_eq!(
            clean_text("\u{201C}quoted\u{201D} \u{2018}it\u{2019}s\u{2019} 1\u{2013}2"),
            "\"quoted\" 'it's' 1-2"
        );
        assert_eq!(clean_text("\u{25CF} item"), "\u{2022} item");
        assert_eq!(clean_text("a&nbsp;&nbsp;b"), "a b");
        assert_eq!(clean_text("   \n\t "), "");
    }

    #[test]
    fn test_indent_from_nearest_list_container() {
        let root = parse_markup(
            r#"<Outline><OEChildren indent="5"><OE><List indent="2"/><T>x</T></OE></OEChildren></Outline>"#,
        )
        .expect("valid");
        let children = &root.children()[0];
        let oe = &children.children()[0];
        assert_eq!(resolve_indent(&[&root, children, oe]), 2);
        assert_eq!(resolve_indent(&[&root, children]), 0);
    }

    #[test]
    fn test_indent_non_numeric_is_zero() {
        let root = parse_markup(r#"<List indent="deep"><T>x</T></List>"#).expect("valid");
        assert_eq!(resolve_indent(&[&root]), 0);
        let root = parse_markup(r#"<List indent="3"><T>x</T></List>"#).expect("valid");
        assert_eq!(resolve_indent(&[&root]), 3);
    }

    #[test]
    fn test_formatting_from_attributes_and_tag() {
        let node = parse_markup(r#"<T bold="true" italic="false" fontSize="14.5">x</T>"#)
            .expect("valid");
        let formatting = extract_formatting(&node, "x");
        assert!(formatting.bold);
        assert!(!formatting.italic);
        assert_eq!(formatting.font_size, Some(14.5));

        let node = parse_markup("<UnderlineText>x</UnderlineText>").expect("valid");
        assert!(extract_formatting(&node, "x").underline);

        let node = parse_markup(r#"<T fontSize="big">x</T>"#).expect("valid");
        assert_eq!(extract_formatting(&node, "x").font_size, None);
    }

    #[test]
    fn test_formatting_from_inline_css() {
        let node = parse_markup("<T/>").expect("valid");
        let raw = "<span style='font-weight:bold;font-size:16.0pt'>Heading</span>";
        let formatting = extract_formatting(&node, raw);
        assert!(formatting.bold);
        assert_eq!(formatting.font_size, Some(16.0));

        // A partial span does not style the whole paragraph
        let raw = "plain <span style='font-style:italic'>bit</span>";
        assert!(!extract_formatting(&node, raw).italic);
    }

    #[test]
    fn test_extract_text_skips_empty() {
        let node = parse_markup("<T><![CDATA[  <br/> ]]></T>").expect("valid");
        assert_eq!(extract_text(&node, &[]), None);
    }
}
