//! Loads a UTF-8 XML document into a [`Tree`].
//!
//! Uses `quick-xml`'s pull-parser event stream rather than `roxmltree`
//! (`petty_xslt::datasources::xml`'s choice): `roxmltree`
//! hands back an immutable tree borrowed from the source text, but the
//! evaluator needs to build brand-new, owned, mutable trees in the exact
//! same representation used for loaded input (constructors, deep copies).
//! One arena, one loader, no borrow split between "input" and "output".

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::node::{NodeId, Tree};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("document has no root element")]
    EmptyDocument,
}

/// Parses `xml` into a fresh [`Tree`], returning the arena and the id of
/// the synthesized `document` node.
pub fn load_document(xml: &str) -> Result<(Tree, NodeId), XmlError> {
    let mut tree = Tree::new();
    let doc = tree.new_document();

    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<NodeId> = vec![doc];
    let mut saw_root = false;

    loop {
        let offset = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| XmlError::Parse {
            offset,
            message: e.to_string(),
        })?;
        match event {
            Event::Start(ref e) => {
                let name = qname_to_string(e.name().as_ref());
                let parent = *stack.last().expect("document stays on the stack");
                let elem = tree.new_element(Some(parent), name);
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| XmlError::Parse {
                        offset,
                        message: err.to_string(),
                    })?;
                    let key = qname_to_string(attr.key.as_ref());
                    let value = attr.unescape_value().map_err(|err| XmlError::Parse {
                        offset,
                        message: err.to_string(),
                    })?;
                    tree.set_attr(elem, key, value.into_owned());
                }
                tree.append_child(parent, elem);
                stack.push(elem);
                saw_root = true;
            }
            Event::Empty(ref e) => {
                let name = qname_to_string(e.name().as_ref());
                let parent = *stack.last().expect("document stays on the stack");
                let elem = tree.new_element(Some(parent), name);
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| XmlError::Parse {
                        offset,
                        message: err.to_string(),
                    })?;
                    let key = qname_to_string(attr.key.as_ref());
                    let value = attr.unescape_value().map_err(|err| XmlError::Parse {
                        offset,
                        message: err.to_string(),
                    })?;
                    tree.set_attr(elem, key, value.into_owned());
                }
                tree.append_child(parent, elem);
                saw_root = true;
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Event::Text(ref e) => {
                let text = e.unescape().map_err(|err| XmlError::Parse {
                    offset,
                    message: err.to_string(),
                })?;
                if !text.is_empty() {
                    let parent = *stack.last().expect("document stays on the stack");
                    let node = tree.new_text(Some(parent), text.into_owned());
                    tree.append_child(parent, node);
                }
            }
            Event::CData(ref e) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                if !text.is_empty() {
                    let parent = *stack.last().expect("document stays on the stack");
                    let node = tree.new_text(Some(parent), text);
                    tree.append_child(parent, node);
                }
            }
            Event::Comment(ref e) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                let parent = *stack.last().expect("document stays on the stack");
                let node = tree.new_comment(Some(parent), text);
                tree.append_child(parent, node);
            }
            Event::PI(ref e) => {
                let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                let (target, content) = match raw.find(char::is_whitespace) {
                    Some(idx) => (raw[..idx].to_string(), raw[idx..].trim_start().to_string()),
                    None => (raw, String::new()),
                };
                let parent = *stack.last().expect("document stays on the stack");
                let node = tree.new_pi(Some(parent), target, content);
                tree.append_child(parent, node);
            }
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !saw_root {
        return Err(XmlError::EmptyDocument);
    }
    log::debug!("loaded document: {} node(s)", tree.descendants(doc).len() + 1);
    Ok((tree, doc))
}

fn qname_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn loads_elements_attributes_and_tail_text() {
        let (tree, doc) = load_document(
            "<root><item id=\"1\"/>between<item id=\"2\">text</item></root>",
        )
        .unwrap();
        let root = tree.get(doc).children[0];
        assert_eq!(tree.get(root).name.as_deref(), Some("root"));
        assert_eq!(tree.get(root).children.len(), 3);

        let first_item = tree.get(root).children[0];
        assert_eq!(tree.get(first_item).attrs, vec![("id".to_string(), "1".to_string())]);

        let tail = tree.get(root).children[1];
        assert_eq!(tree.get(tail).kind, NodeKind::Text);
        assert_eq!(tree.get(tail).value.as_deref(), Some("between"));

        let second_item = tree.get(root).children[2];
        let inner_text = tree.get(second_item).children[0];
        assert_eq!(tree.get(inner_text).value.as_deref(), Some("text"));
    }

    #[test]
    fn preserves_attribute_insertion_order() {
        let (tree, doc) = load_document("<e b=\"2\" a=\"1\"/>").unwrap();
        let root = tree.get(doc).children[0];
        let names: Vec<&str> = tree.get(root).attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn rejects_empty_document() {
        assert!(load_document("   ").is_err());
    }

    #[test]
    fn loads_comments_and_processing_instructions() {
        let (tree, doc) = load_document("<root><!--hi--><?target value?></root>").unwrap();
        let root = tree.get(doc).children[0];
        let comment = tree.get(root).children[0];
        assert_eq!(tree.get(comment).kind, NodeKind::Comment);
        assert_eq!(tree.get(comment).value.as_deref(), Some("hi"));
        let pi = tree.get(root).children[1];
        assert_eq!(tree.get(pi).kind, NodeKind::Pi);
        assert_eq!(tree.get(pi).name.as_deref(), Some("target"));
    }
}
