//! Path evaluation: resolving a path start, then walking each step's axis,
//! node test and predicates in turn.
//!
//! The three-stage pipeline (collect axis nodes, filter by node test,
//! apply predicates) is the same shape as `petty_xpath1::engine`'s
//! `collect_axis_nodes` / `filter_by_node_test` / `apply_predicates`,
//! adapted to the arena-indexed `xform_xml::Tree` instead of a generic
//! `DataSourceNode` trait, and to XForm's simpler axis set (no ancestor,
//! sibling or following/preceding axes). The `attr` axis is handled
//! separately since, unlike every other axis, it allocates fresh nodes
//! rather than just selecting existing ones.

use xform_ast::{Axis, PathExpr, PathStart, PathStep, StepTest};
use xform_xml::{NodeId, NodeKind, Tree};

use crate::coerce::to_boolean;
use crate::context::EvalContext;
use crate::error::EvalError;
use crate::eval::eval_expr;
use crate::value::Value;

/// Evaluates a path expression against `ctx`, returning the matched nodes
/// in document order (duplicates are possible when overlapping `//` steps
/// intersect; accepted as-is — see DESIGN.md's Open Question decisions).
pub fn eval_path(tree: &mut Tree, ctx: &EvalContext, path: &PathExpr) -> Result<Vec<NodeId>, EvalError> {
    let mut current = resolve_start(tree, ctx, &path.start)?;
    // `.//` and `//` are the context item / document root with an implicit
    // desc-or-self step prepended.
    if matches!(path.start, PathStart::Desc | PathStart::DescRoot) {
        current = collect_axis(tree, Axis::DescOrSelf, &current);
    }
    for step in &path.steps {
        current = eval_step(tree, ctx, step, &current)?;
    }
    Ok(current)
}

fn resolve_start(tree: &Tree, ctx: &EvalContext, start: &PathStart) -> Result<Vec<NodeId>, EvalError> {
    match start {
        PathStart::Context => Ok(ctx.item.into_iter().collect()),
        PathStart::Desc => Ok(ctx.item.into_iter().collect()),
        PathStart::Root => Ok(ctx.item.map(|id| vec![tree.root_of(id)]).unwrap_or_default()),
        PathStart::DescRoot => Ok(ctx.item.map(|id| vec![tree.root_of(id)]).unwrap_or_default()),
        PathStart::Var(name) => {
            if let Some(seq) = ctx.env.get(name) {
                Ok(seq.iter().filter_map(as_node).collect())
            } else {
                // VarRef fallback: an unbound bare name degrades to an
                // implicit first child-axis step with that name.
                let candidates: Vec<NodeId> = ctx.item.into_iter().collect();
                Ok(child_axis(tree, &candidates)
                    .into_iter()
                    .filter(|&id| {
                        tree.get(id).kind == NodeKind::Element && tree.get(id).name.as_deref() == Some(name.as_str())
                    })
                    .collect())
            }
        }
    }
}

fn as_node(value: &Value) -> Option<NodeId> {
    match value {
        Value::Node(id) => Some(*id),
        _ => None,
    }
}

fn child_axis(tree: &Tree, nodes: &[NodeId]) -> Vec<NodeId> {
    let mut out = Vec::new();
    for &id in nodes {
        let node = tree.get(id);
        if matches!(node.kind, NodeKind::Element | NodeKind::Document) {
            out.extend(node.children.iter().copied());
        }
    }
    out
}

fn eval_step(
    tree: &mut Tree,
    ctx: &EvalContext,
    step: &PathStep,
    context_nodes: &[NodeId],
) -> Result<Vec<NodeId>, EvalError> {
    let candidates = if step.axis == Axis::Attr {
        collect_attrs(tree, context_nodes, &step.test)
    } else {
        let axis_nodes = collect_axis(tree, step.axis, context_nodes);
        filter_by_test(tree, &axis_nodes, &step.test)
    };
    apply_predicates(tree, ctx, &candidates, &step.predicates)
}

fn collect_axis(tree: &Tree, axis: Axis, context_nodes: &[NodeId]) -> Vec<NodeId> {
    let mut out = Vec::new();
    for &id in context_nodes {
        match axis {
            Axis::SelfAxis => out.push(id),
            Axis::Parent => {
                if let Some(parent) = tree.get(id).parent {
                    out.push(parent);
                }
            }
            Axis::DescOrSelf => {
                out.push(id);
                out.extend(tree.descendants(id));
            }
            Axis::Desc => out.extend(tree.descendants(id)),
            Axis::Child => out.extend(child_axis(tree, &[id])),
            Axis::Attr => unreachable!("attr axis handled separately in eval_step"),
        }
    }
    out
}

fn filter_by_test(tree: &Tree, nodes: &[NodeId], test: &StepTest) -> Vec<NodeId> {
    nodes
        .iter()
        .copied()
        .filter(|&id| {
            let node = tree.get(id);
            match test {
                StepTest::Wildcard => node.kind == NodeKind::Element,
                StepTest::Name(name) => node.kind == NodeKind::Element && node.name.as_deref() == Some(name),
                StepTest::TextTest => node.kind == NodeKind::Text,
                StepTest::NodeTest => true,
                StepTest::CommentTest => node.kind == NodeKind::Comment,
                StepTest::PiTest => node.kind == NodeKind::Pi,
            }
        })
        .collect()
}

/// Attribute nodes are synthesized on demand rather than stored as
/// children, so this both selects which attributes match `test` and
/// allocates a fresh node for each one.
fn collect_attrs(tree: &mut Tree, context_nodes: &[NodeId], test: &StepTest) -> Vec<NodeId> {
    let mut out = Vec::new();
    for &id in context_nodes {
        let (kind, attrs) = {
            let node = tree.get(id);
            (node.kind, node.attrs.clone())
        };
        if kind != NodeKind::Element {
            continue;
        }
        match test {
            StepTest::Name(name) => {
                if let Some((_, value)) = attrs.iter().find(|(k, _)| k == name) {
                    out.push(tree.new_attribute_node(id, name.clone(), value.clone()));
                }
            }
            StepTest::Wildcard => {
                for (key, value) in &attrs {
                    out.push(tree.new_attribute_node(id, key.clone(), value.clone()));
                }
            }
            _ => {}
        }
    }
    out
}

fn apply_predicates(
    tree: &mut Tree,
    ctx: &EvalContext,
    nodes: &[NodeId],
    predicates: &[xform_ast::Expr],
) -> Result<Vec<NodeId>, EvalError> {
    let mut current = nodes.to_vec();
    for predicate in predicates {
        let last = current.len();
        let mut kept = Vec::new();
        for (i, &id) in current.iter().enumerate() {
            let pred_ctx = ctx.with_item(Some(id)).with_position(i + 1, last);
            let result = eval_expr(tree, &pred_ctx, predicate)?;
            // Predicates are pure boolean filters: a numeric result
            // coerces by "!= 0", not XPath-style positional selection
            // (see DESIGN.md's Open Question decisions).
            if to_boolean(&result) {
                kept.push(id);
            }
        }
        current = kept;
    }
    Ok(current)
}

/// Synthesizes a single attribute node for the `attr(node, name)` and
/// `attr()` axis-adjacent built-ins that need one attribute outside of a
/// path step.
pub fn attribute_value(tree: &Tree, id: NodeId, name: &str) -> Option<String> {
    let node = tree.get(id);
    if node.kind != NodeKind::Element {
        return None;
    }
    node.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xform_xml::load_document;

    #[test]
    fn collect_axis_child_then_filter_by_wildcard() {
        let (tree, doc) = load_document("<root>text<a/><b/></root>").unwrap();
        let root = tree.get(doc).children[0];
        let children = collect_axis(&tree, Axis::Child, &[root]);
        assert_eq!(children.len(), 3);
        let filtered = filter_by_test(&tree, &children, &StepTest::Wildcard);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn descendant_or_self_includes_self() {
        let (tree, doc) = load_document("<root><a><b/></a></root>").unwrap();
        let root = tree.get(doc).children[0];
        let collected = collect_axis(&tree, Axis::DescOrSelf, &[root]);
        assert_eq!(collected[0], root);
        assert_eq!(collected.len(), 3);
    }

    #[test]
    fn attr_axis_synthesizes_named_attribute() {
        let (mut tree, doc) = load_document(r#"<item id="7"/>"#).unwrap();
        let root = tree.get(doc).children[0];
        let attrs = collect_attrs(&mut tree, &[root], &StepTest::Name("id".to_string()));
        assert_eq!(attrs.len(), 1);
        assert_eq!(tree.get(attrs[0]).value.as_deref(), Some("7"));
    }

    #[test]
    fn attr_axis_wildcard_returns_all_attributes() {
        let (mut tree, doc) = load_document(r#"<item a="1" b="2"/>"#).unwrap();
        let root = tree.get(doc).children[0];
        let attrs = collect_attrs(&mut tree, &[root], &StepTest::Wildcard);
        assert_eq!(attrs.len(), 2);
    }
}
