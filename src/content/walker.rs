//! Order-preserving traversal of a page tree
//!
//! The walker visits nodes depth-first in document order and yields one
//! [`ContentUnit`] per classified node. Extraction is deferred until the
//! consumer asks for the next unit.

use log::debug;

use super::models::ContentUnit;
use super::parsing;
use super::tree::{ContentNode, MarkupNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Table,
    Image,
    Text,
    Other,
}

fn classify(node: &ContentNode) -> NodeKind {
    match node.name() {
        "Table" => NodeKind::Table,
        "Image" => NodeKind::Image,
        "T" => NodeKind::Text,
        // Older exports put text directly on the outline element
        "OE" if node.text().is_some_and(|t| !t.trim().is_empty())
            && node.find_all_local("T").next().is_none() =>
        {
            NodeKind::Text
        }
        _ => NodeKind::Other,
    }
}

struct Frame<'a> {
    node: &'a ContentNode,
    depth: usize,
    in_table: bool,
    in_text: bool,
}

pub struct UnitWalker<'a> {
    stack: Vec<Frame<'a>>,
    /// Ancestors of the node being visited, root first
    path: Vec<&'a ContentNode>,
    include_images: bool,
}

impl<'a> UnitWalker<'a> {
    pub fn new(root: &'a ContentNode, include_images: bool) -> Self {
        let stack = root
            .children()
            .iter()
            .rev()
            .map(|node| Frame {
                node,
                depth: 1,
                in_table: false,
                in_text: false,
            })
            .collect();

        Self {
            stack,
            path: vec![root],
            include_images,
        }
    }

    fn extract(&self, frame: &Frame<'a>, kind: NodeKind) -> Option<ContentUnit> {
        match kind {
            NodeKind::Table => parsing::extract_table(frame.node).map(ContentUnit::Table),
            NodeKind::Image if self.include_images => {
                parsing::extract_image(frame.node).map(ContentUnit::Image)
            }
            NodeKind::Text if !frame.in_table && !frame.in_text => {
                parsing::extract_text(frame.node, &self.path).map(ContentUnit::Text)
            }
            _ => None,
        }
    }
}

impl<'a> Iterator for UnitWalker<'a> {
    type Item = ContentUnit;

    fn next(&mut self) -> Option<ContentUnit> {
        while let Some(frame) = self.stack.pop() {
            self.path.truncate(frame.depth);

            let kind = classify(frame.node);
            let unit = self.extract(&frame, kind);
            if unit.is_none() && matches!(kind, NodeKind::Table | NodeKind::Image) {
                debug!("no {kind:?} data extracted from <{}>", frame.node.name());
            }

            let in_table = frame.in_table || kind == NodeKind::Table;
            let in_text = frame.in_text || kind == NodeKind::Text;
            self.path.push(frame.node);
            self.stack.extend(frame.node.children().iter().rev().map(|node| Frame {
                node,
                depth: frame.depth + 1,
                in_table,
                in_text,
            }));

            if unit.is_some() {
                return unit;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::models::TableGrid;
    use crate::content::tree::parse_markup;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn units(markup: &str, include_images: bool) -> Vec<ContentUnit> {
        let root = parse_markup(markup).expect("valid");
        UnitWalker::new(&root, include_images).collect()
    }

    fn text_of(unit: &ContentUnit) -> &str {
        match unit {
            ContentUnit::Text(t) => &t.text,
            other => panic!("expected text, got {}", other.kind()),
        }
    }

    #[test]
    fn test_document_order_across_nesting() {
        let payload = STANDARD.encode(vec![3u8; 200]);
        let markup = format!(
            "<Page><Title><OE><T>Title</T></OE></Title><Outline><OEChildren>\
             <OE><T>before</T></OE>\
             <OE><Table><Row><Cell><T>c1</T></Cell></Row></Table></OE>\
             <OE><T>between</T><OEChildren><OE><Image><Data>{payload}</Data></Image></OE></OEChildren></OE>\
             <OE><T>after</T></OE></OEChildren></Outline></Page>"
        );
        let kinds: Vec<&str> = units(&markup, true).iter().map(ContentUnit::kind).collect();
        assert_eq!(kinds, vec!["text", "text", "table", "text", "image", "text"]);
    }

    #[test]
    fn test_table_cells_are_not_emitted_as_text() {
        let found = units(
            "<Page><Table><Row><Cell><OE><T>x</T></OE></Cell><Cell><T>y</T></Cell></Row></Table></Page>",
            true,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0],
            ContentUnit::Table(TableGrid::new(vec![vec!["x".into(), "y".into()]]))
        );
    }

    #[test]
    fn test_images_are_skipped_when_disabled() {
        let payload = STANDARD.encode(vec![3u8; 200]);
        let markup = format!("<Page><Image data=\"{payload}\"/><T>caption</T></Page>");
        assert_eq!(units(&markup, true).len(), 2);
        let found = units(&markup, false);
        assert_eq!(found.len(), 1);
        assert_eq!(text_of(&found[0]), "caption");
    }

    #[test]
    fn test_legacy_outline_text_and_indent() {
        let found = units(
            r#"<Page><OEChildren><OE>plain outline text</OE>
               <OE><List indent="2"/><T>nested item</T></OE></OEChildren></Page>"#,
            true,
        );
        assert_eq!(found.len(), 2);
        assert_eq!(text_of(&found[0]), "plain outline text");
        match &found[1] {
            ContentUnit::Text(t) => assert_eq!(t.indent, 2),
            other => panic!("unexpected {}", other.kind()),
        }
    }

    #[test]
    fn test_text_nested_in_text_is_emitted_once() {
        let found = units("<Page><T>outer <T>inner</T></T><T>   </T></Page>", true);
        assert_eq!(found.len(), 1);
        assert_eq!(text_of(&found[0]), "outer inner");
    }
}
