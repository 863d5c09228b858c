//! Pattern matching: the single function both `match` expressions and rule
//! dispatch share, per `petty_xslt::pattern`
//! (template-rule patterns) — here returning `(matched, bindings)` instead
//! of a numeric priority, since XForm rule sets are dispatched strictly by
//! first-match order rather than XSLT's specificity ranking.

use xform_ast::{Pattern, TypedPatternKind};
use xform_xml::{NodeId, NodeKind, Tree};

use crate::value::{Sequence, Value};

/// A pattern match's bindings: variable name to bound sequence.
pub type Bindings = Vec<(String, Sequence)>;

/// Tests whether `item` matches `pattern`, returning the bindings to merge
/// into the case/rule body's environment on success.
pub fn matches(tree: &Tree, item: &Value, pattern: &Pattern) -> Option<Bindings> {
    match pattern {
        Pattern::Wildcard => Some(Vec::new()),
        Pattern::Typed(kind) => match item {
            Value::Node(id) => {
                let node_kind = tree.get(*id).kind;
                let ok = match kind {
                    TypedPatternKind::Node => true,
                    TypedPatternKind::Text => node_kind == NodeKind::Text,
                    TypedPatternKind::Comment => node_kind == NodeKind::Comment,
                };
                ok.then(Vec::new)
            }
            _ => None,
        },
        Pattern::Attribute(name) => match item {
            Value::Node(id) => {
                let node = tree.get(*id);
                (node.kind == NodeKind::Attribute && node.name.as_deref() == Some(name.as_str()))
                    .then(Vec::new)
            }
            _ => None,
        },
        Pattern::Element { name, var, child } => match item {
            Value::Node(id) => {
                let node = tree.get(*id);
                if node.kind != NodeKind::Element || node.name.as_deref() != Some(name.as_str()) {
                    return None;
                }
                if let Some(var_name) = var {
                    let children: Sequence = node.children.iter().copied().map(Value::Node).collect();
                    return Some(vec![(var_name.clone(), children)]);
                }
                if let Some(child_pattern) = child {
                    // First matching child wins; its bindings are merged.
                    for &child_id in &node.children {
                        if let Some(bindings) = matches(tree, &Value::Node(child_id), child_pattern) {
                            return Some(bindings);
                        }
                    }
                    return None;
                }
                Some(Vec::new())
            }
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xform_xml::load_document;

    #[test]
    fn wildcard_matches_anything() {
        let tree = Tree::new();
        assert!(matches(&tree, &Value::Bool(true), &Pattern::Wildcard).is_some());
    }

    #[test]
    fn element_pattern_binds_children() {
        let (tree, doc) = load_document("<item><a/><b/></item>").unwrap();
        let root = tree.get(doc).children[0];
        let pattern = Pattern::Element { name: "item".to_string(), var: Some("v".to_string()), child: None };
        let bindings = matches(&tree, &Value::Node(root), &pattern).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].0, "v");
        assert_eq!(bindings[0].1.len(), 2);
    }

    #[test]
    fn element_pattern_with_nested_child_requires_match_among_children() {
        let (tree, doc) = load_document("<item><a/><b/></item>").unwrap();
        let root = tree.get(doc).children[0];
        let pattern = Pattern::Element {
            name: "item".to_string(),
            var: None,
            child: Some(Box::new(Pattern::Element { name: "b".to_string(), var: None, child: None })),
        };
        assert!(matches(&tree, &Value::Node(root), &pattern).is_some());

        let pattern_miss = Pattern::Element {
            name: "item".to_string(),
            var: None,
            child: Some(Box::new(Pattern::Element { name: "c".to_string(), var: None, child: None })),
        };
        assert!(matches(&tree, &Value::Node(root), &pattern_miss).is_none());
    }

    #[test]
    fn typed_pattern_matches_by_node_kind() {
        let (tree, doc) = load_document("<item>hi</item>").unwrap();
        let root = tree.get(doc).children[0];
        let text = tree.get(root).children[0];
        assert!(matches(&tree, &Value::Node(text), &Pattern::Typed(TypedPatternKind::Text)).is_some());
        assert!(matches(&tree, &Value::Node(root), &Pattern::Typed(TypedPatternKind::Text)).is_none());
    }
}
