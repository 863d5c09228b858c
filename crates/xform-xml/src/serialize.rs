//! Direct string-building XML serialization.
//!
//! `petty_xslt::output`'s `OutputBuilder`/`BufferingOutputBuilder`
//! is shaped around PDF/IDF block-level commands (start/end_table, add_text,
//! ...) with no XML analogue, so the serializer here is a small dedicated
//! recursive function instead of an adaptation of that trait.

use crate::node::{NodeKind, Tree};
use crate::NodeId;

/// Serializes `id` (and, for `document`/`element`, its descendants) as a
/// well-formed XML fragment. No XML declaration is emitted.
pub fn serialize_node(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out);
    log::trace!("serialized node {id} to {} byte(s)", out.len());
    out
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String) {
    let node = tree.get(id);
    match node.kind {
        NodeKind::Document => {
            for &child in &node.children {
                write_node(tree, child, out);
            }
        }
        NodeKind::Text => {
            escape_text(node.value.as_deref().unwrap_or(""), out);
        }
        NodeKind::Attribute => {
            escape_attr(node.value.as_deref().unwrap_or(""), out);
        }
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(node.value.as_deref().unwrap_or(""));
            out.push_str("-->");
        }
        NodeKind::Pi => {
            out.push_str("<?");
            out.push_str(node.name.as_deref().unwrap_or(""));
            if let Some(content) = &node.value {
                if !content.is_empty() {
                    out.push(' ');
                    out.push_str(content);
                }
            }
            out.push_str("?>");
        }
        NodeKind::Element => {
            let name = node.name.as_deref().unwrap_or("");
            out.push('<');
            out.push_str(name);
            for (key, value) in &node.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            if node.children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for &child in &node.children {
                write_node(tree, child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}

fn escape_attr(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::load_document;

    #[test]
    fn empty_element_self_closes() {
        let (tree, doc) = load_document("<root/>").unwrap();
        let root = tree.get(doc).children[0];
        assert_eq!(serialize_node(&tree, root), "<root/>");
    }

    #[test]
    fn escapes_text_and_attribute_values() {
        let mut tree = Tree::new();
        let doc = tree.new_document();
        let elem = tree.new_element(Some(doc), "e");
        tree.append_child(doc, elem);
        tree.set_attr(elem, "q", "a\"<b>&c");
        let text = tree.new_text(Some(elem), "<tag> & more");
        tree.append_child(elem, text);
        assert_eq!(
            serialize_node(&tree, elem),
            "<e q=\"a&quot;&lt;b&gt;&amp;c\">&lt;tag&gt; &amp; more</e>"
        );
    }
}
