//! Arena-based XML node model.
//!
//! Parent links form a cycle between a node and its children, so instead of
//! `Rc`/`Weak` the tree is a flat `Vec<XmlNode>` addressed by index. This
//! matches the axis-collection style in `petty_xpath1::axes`,
//! which walks a generic `DataSourceNode` rather than owning pointers.

use std::fmt;

/// Index into a [`Tree`]'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    Pi,
}

#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub value: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl XmlNode {
    fn bare(kind: NodeKind, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            name: None,
            value: None,
            attrs: Vec::new(),
            children: Vec::new(),
            parent,
        }
    }
}

/// Owns every node produced by loading a document or by evaluation
/// (constructors, deep copies). A single arena backs both the input tree
/// and any output trees built during a run.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<XmlNode>,
}

impl Tree {
    pub fn new() -> Self {
        Tree { nodes: Vec::new() }
    }

    pub fn get(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut XmlNode {
        &mut self.nodes[id.0 as usize]
    }

    fn alloc(&mut self, node: XmlNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn new_document(&mut self) -> NodeId {
        self.alloc(XmlNode::bare(NodeKind::Document, None))
    }

    pub fn new_element(&mut self, parent: Option<NodeId>, name: impl Into<String>) -> NodeId {
        let mut node = XmlNode::bare(NodeKind::Element, parent);
        node.name = Some(name.into());
        self.alloc(node)
    }

    pub fn new_text(&mut self, parent: Option<NodeId>, value: impl Into<String>) -> NodeId {
        let mut node = XmlNode::bare(NodeKind::Text, parent);
        node.value = Some(value.into());
        self.alloc(node)
    }

    pub fn new_comment(&mut self, parent: Option<NodeId>, value: impl Into<String>) -> NodeId {
        let mut node = XmlNode::bare(NodeKind::Comment, parent);
        node.value = Some(value.into());
        self.alloc(node)
    }

    pub fn new_pi(
        &mut self,
        parent: Option<NodeId>,
        target: impl Into<String>,
        content: impl Into<String>,
    ) -> NodeId {
        let mut node = XmlNode::bare(NodeKind::Pi, parent);
        node.name = Some(target.into());
        node.value = Some(content.into());
        self.alloc(node)
    }

    /// Synthesizes a standalone attribute node for path navigation. Not
    /// inserted into `element`'s children, per the data model's invariant
    /// that attribute nodes are synthesized on demand.
    pub fn new_attribute_node(
        &mut self,
        element: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> NodeId {
        let mut node = XmlNode::bare(NodeKind::Attribute, Some(element));
        node.name = Some(name.into());
        node.value = Some(value.into());
        self.alloc(node)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0 as usize].children.push(child);
    }

    pub fn set_attr(&mut self, element: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.nodes[element.0 as usize].attrs.push((name.into(), value.into()));
    }

    /// The concatenation-of-descendant-text rule used throughout the
    /// evaluator's coercions.
    pub fn string_value(&self, id: NodeId) -> String {
        let node = self.get(id);
        match node.kind {
            NodeKind::Text | NodeKind::Attribute => node.value.clone().unwrap_or_default(),
            NodeKind::Element | NodeKind::Document => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
            NodeKind::Comment | NodeKind::Pi => String::new(),
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = self.get(id);
        match node.kind {
            NodeKind::Text => out.push_str(node.value.as_deref().unwrap_or("")),
            NodeKind::Element | NodeKind::Document => {
                for &child in &node.children {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// All descendants of `id`, in document order, not including `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.get(id).children {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    /// Ascends parent links to find the top-most node (the document, for a
    /// properly loaded tree).
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.get(current).parent {
            current = parent;
        }
        current
    }

    /// Structural copy of the subtree rooted at `id`. When `recurse` is
    /// false only the node itself is copied, with no children. The copy's
    /// parent is left unset; callers attach it with [`Tree::append_child`].
    pub fn deep_copy(&mut self, id: NodeId, recurse: bool) -> NodeId {
        if recurse {
            let size = self.descendants(id).len();
            if size > 256 {
                log::debug!("deep-copying subtree of {size} descendants (node {id})");
            }
        }
        self.deep_copy_inner(id, recurse)
    }

    fn deep_copy_inner(&mut self, id: NodeId, recurse: bool) -> NodeId {
        let (kind, name, value, attrs) = {
            let node = self.get(id);
            (node.kind, node.name.clone(), node.value.clone(), node.attrs.clone())
        };
        let mut copy = XmlNode::bare(kind, None);
        copy.name = name;
        copy.value = value;
        copy.attrs = attrs;
        let new_id = self.alloc(copy);
        if recurse {
            let children: Vec<NodeId> = self.get(id).children.clone();
            for child in children {
                let child_copy = self.deep_copy_inner(child, true);
                self.get_mut(child_copy).parent = Some(new_id);
                self.get_mut(new_id).children.push(child_copy);
            }
        }
        new_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let doc = tree.new_document();
        let root = tree.new_element(Some(doc), "root");
        tree.append_child(doc, root);
        let a = tree.new_element(Some(root), "a");
        tree.append_child(root, a);
        let text = tree.new_text(Some(a), "hello");
        tree.append_child(a, text);
        (tree, doc, root)
    }

    #[test]
    fn string_value_concatenates_descendant_text() {
        let (tree, doc, _root) = sample_tree();
        assert_eq!(tree.string_value(doc), "hello");
    }

    #[test]
    fn descendants_are_in_document_order() {
        let (tree, doc, root) = sample_tree();
        let descendants = tree.descendants(doc);
        assert_eq!(descendants.len(), 3);
        assert_eq!(descendants[0], root);
    }

    #[test]
    fn deep_copy_has_fresh_parents_and_no_shared_identity() {
        let (mut tree, _doc, root) = sample_tree();
        let copy = tree.deep_copy(root, true);
        assert_ne!(copy, root);
        assert!(tree.get(copy).parent.is_none());
        let original_child = tree.get(root).children[0];
        let copied_child = tree.get(copy).children[0];
        assert_ne!(original_child, copied_child);
        assert_eq!(tree.get_mut(copied_child).name.take(), Some("a".to_string()));
        assert_eq!(tree.get(original_child).name.as_deref(), Some("a"));
    }

    #[test]
    fn synthesized_attribute_is_not_a_child() {
        let (mut tree, _doc, root) = sample_tree();
        let attr = tree.new_attribute_node(root, "id", "1");
        assert_eq!(tree.get(attr).parent, Some(root));
        assert!(!tree.get(root).children.contains(&attr));
    }
}
