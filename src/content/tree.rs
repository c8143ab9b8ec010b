//! Page markup tree
//!
//! Markup is parsed once into an immutable [`ContentNode`] tree. Namespace
//! prefixes are dropped so lookups work on local names regardless of which
//! schema version or prefix the exporting application used.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ParseError;

/// Tree access shared by every markup representation the extractors work on.
pub trait MarkupNode: Sized {
    fn local_name(&self) -> &str;

    fn child_nodes(&self) -> &[Self];

    /// All nodes below `self` in document (pre-)order, excluding `self`
    fn descendants(&self) -> Descendants<'_, Self> {
        Descendants {
            stack: self.child_nodes().iter().rev().collect(),
        }
    }

    /// Subtree-wide search by local tag name
    fn find_all_local<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.descendants().filter(move |node| node.local_name() == name)
    }
}

pub struct Descendants<'a, N> {
    stack: Vec<&'a N>,
}

impl<'a, N: MarkupNode> Iterator for Descendants<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<&'a N> {
        let node = self.stack.pop()?;
        self.stack.extend(node.child_nodes().iter().rev());
        Some(node)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentNode {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<ContentNode>,
    text: Option<String>,
    tail: Option<String>,
}

impl ContentNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn children(&self) -> &[ContentNode] {
        &self.children
    }

    /// Character data before the first child
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Character data following this node inside its parent
    pub fn tail(&self) -> Option<&str> {
        self.tail.as_deref()
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.name == name)
    }

    /// Every text and tail fragment inside this subtree, in document order
    pub fn text_fragments(&self) -> Vec<&str> {
        let mut fragments = Vec::new();
        self.collect_fragments(&mut fragments);
        fragments
    }

    fn collect_fragments<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(text) = self.text.as_deref() {
            out.push(text);
        }
        for child in &self.children {
            child.collect_fragments(out);
            if let Some(tail) = child.tail.as_deref() {
                out.push(tail);
            }
        }
    }

    /// All character data of the subtree concatenated
    pub fn full_text(&self) -> String {
        self.text_fragments().concat()
    }
}

impl MarkupNode for ContentNode {
    fn local_name(&self) -> &str {
        &self.name
    }

    fn child_nodes(&self) -> &[Self] {
        &self.children
    }
}

/// Parse markup text into a tree rooted at its single top-level element
pub fn parse_markup(input: &str) -> Result<ContentNode, ParseError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<ContentNode> = Vec::new();
    let mut root: Option<ContentNode> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| syntax_error(reader.error_position() as u64, e))?;
        match event {
            Event::Start(ref e) => {
                if root.is_some() && stack.is_empty() {
                    return Err(ParseError::MultipleRoots(local_name(e)));
                }
                stack.push(node_from_start(e, reader.buffer_position() as u64)?);
            }
            Event::Empty(ref e) => {
                let node = node_from_start(e, reader.buffer_position() as u64)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(ref e) => {
                let found = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let Some(node) = stack.pop() else {
                    return Err(ParseError::MismatchedEnd {
                        expected: String::new(),
                        found,
                    });
                };
                if node.name != found {
                    return Err(ParseError::MismatchedEnd {
                        expected: node.name,
                        found,
                    });
                }
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(ref e) => {
                // Unknown entities are kept verbatim; text cleaning unescapes them later
                let text = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                append_text(&mut stack, &text, reader.buffer_position() as u64)?;
            }
            Event::CData(ref e) => {
                let text = String::from_utf8_lossy(e).into_owned();
                append_text(&mut stack, &text, reader.buffer_position() as u64)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::Unclosed(open.name));
    }
    root.ok_or(ParseError::NoRoot)
}

fn syntax_error(position: u64, err: impl std::fmt::Display) -> ParseError {
    ParseError::Syntax {
        position,
        message: err.to_string(),
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn node_from_start(e: &BytesStart, position: u64) -> Result<ContentNode, ParseError> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| syntax_error(position, err))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        attributes.push((key, value));
    }

    Ok(ContentNode {
        name: local_name(e),
        attributes,
        ..ContentNode::default()
    })
}

fn attach(
    stack: &mut [ContentNode],
    root: &mut Option<ContentNode>,
    node: ContentNode,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    } else {
        return Err(ParseError::MultipleRoots(node.name));
    }
    Ok(())
}

fn append_text(stack: &mut [ContentNode], text: &str, position: u64) -> Result<(), ParseError> {
    let Some(parent) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(syntax_error(position, "character data outside the root element"));
    };

    let slot = match parent.children.last_mut() {
        Some(last) => &mut last.tail,
        None => &mut parent.text,
    };
    slot.get_or_insert_with(String::new).push_str(text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0"?>
<one:Page xmlns:one="http://schemas.microsoft.com/office/onenote/2013/onenote" name="Plan">
  <one:Outline>
    <one:OEChildren>
      <one:OE><one:T><![CDATA[First]]></one:T></one:OE>
      <one:OE><one:T>Second &amp; last</one:T></one:OE>
    </one:OEChildren>
  </one:Outline>
</one:Page>"#;

    #[test]
    fn test_prefixes_are_stripped() {
        let root = parse_markup(PAGE).expect("valid page");
        assert_eq!(root.name(), "Page");
        assert_eq!(root.attr("name"), Some("Plan"));
        // namespace declarations are not attributes
        assert_eq!(root.attributes().count(), 1);
    }

    #[test]
    fn test_find_all_local_searches_whole_subtree() {
        let root = parse_markup(PAGE).expect("valid page");
        let texts: Vec<String> = root.find_all_local("T").map(|t| t.full_text()).collect();
        assert_eq!(texts, vec!["First", "Second & last"]);
        assert_eq!(root.find_all_local("Page").count(), 0);
    }

    #[test]
    fn test_text_and_tail_placement() {
        let root = parse_markup("<a>one<b>two</b>three<c/>four</a>").expect("valid");
        assert_eq!(root.text(), Some("one"));
        assert_eq!(root.children()[0].tail(), Some("three"));
        assert_eq!(root.children()[1].tail(), Some("four"));
        assert_eq!(root.text_fragments(), vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_descendants_pre_order() {
        let root = parse_markup("<r><a><b/></a><c/></r>").expect("valid");
        let names: Vec<&str> = root.descendants().map(|n| n.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_malformed_markup() {
        assert!(matches!(parse_markup(""), Err(ParseError::NoRoot)));
        assert!(matches!(
            parse_markup("<a><b></a>"),
            Err(ParseError::Syntax { .. } | ParseError::MismatchedEnd { .. })
        ));
        assert!(matches!(parse_markup("<a><b>"), Err(ParseError::Unclosed(_))));
        assert!(matches!(
            parse_markup("<a/><b/>"),
            Err(ParseError::MultipleRoots(_))
        ));
        assert!(parse_markup("not markup at all").is_err());
    }

    #[test]
    fn test_unknown_entity_is_kept() {
        let root = parse_markup("<T>a&nbsp;b</T>").expect("lenient text");
        assert!(root.full_text().contains("nbsp"));
    }
}
