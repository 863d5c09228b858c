//! The built-in function library.
//!
//! Shaped after `petty_xpath1::functions::FunctionRegistry::evaluate_function`:
//! a flat name-to-arm dispatcher, each arm a small focused helper that reads
//! its arguments positionally and returns a [`Sequence`]. Generalized from
//! `petty_xpath1`'s XPath 1.0 function set (string/number/boolean/count/...) to
//! the language's own table, which adds tree-shape built-ins (`children`,
//! `elements`, `copy`), the sequence utilities (`distinct`, `sort`, `index`,
//! `groupBy`, `lookup`) and rule dispatch (`apply`).

use std::rc::Rc;

use xform_xml::{NodeKind, Tree};

use crate::coerce::{to_boolean, to_number, to_string};
use crate::context::EvalContext;
use crate::error::EvalError;
use crate::eval::{apply_rule, invoke_named};
use crate::path::attribute_value;
use crate::value::{empty, singleton, MapValue, Sequence, Value};

const NAMES: &[&str] = &[
    "string", "number", "boolean", "typeOf", "name", "attr", "text", "children", "elements",
    "copy", "count", "empty", "distinct", "sort", "concat", "seq", "head", "tail", "last",
    "position", "sum", "index", "lookup", "groupBy", "apply",
];

pub fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

/// `(min, max)` arity for every built-in with a spec-fixed signature; `None`
/// for `max` means variadic (`concat`/`seq`). Checked before dispatch so a
/// missing required argument raises `XFDY0002` instead of silently reading
/// as an empty sequence.
fn arity_bounds(name: &str) -> Option<(usize, Option<usize>)> {
    match name {
        "string" | "number" | "boolean" | "typeOf" | "name" | "children" | "count" | "empty"
        | "distinct" | "head" | "tail" | "sum" => Some((1, Some(1))),
        "attr" | "lookup" | "groupBy" => Some((2, Some(2))),
        "text" | "elements" | "copy" | "sort" | "index" | "apply" => Some((1, Some(2))),
        "last" => Some((0, Some(1))),
        "position" => Some((0, Some(0))),
        "concat" | "seq" => None,
        _ => None,
    }
}

fn check_arity(name: &str, got: usize) -> Result<(), EvalError> {
    let Some((min, max)) = arity_bounds(name) else { return Ok(()) };
    if got < min || max.is_some_and(|max| got > max) {
        return Err(EvalError::arity_range(name, min, max, got));
    }
    Ok(())
}

pub fn call_builtin(
    tree: &mut Tree,
    ctx: &EvalContext,
    name: &str,
    mut args: Vec<Sequence>,
) -> Result<Sequence, EvalError> {
    check_arity(name, args.len())?;
    match name {
        "string" => Ok(singleton(Value::Str(to_string(tree, &arg(&mut args, 0))))),
        "number" => Ok(singleton(Value::Number(to_number(tree, &arg(&mut args, 0))?))),
        "boolean" => Ok(singleton(Value::Bool(to_boolean(&arg(&mut args, 0))))),
        "typeOf" => Ok(singleton(Value::Str(type_of(&arg(&mut args, 0))))),
        "name" => Ok(singleton(Value::Str(node_name(tree, &arg(&mut args, 0))))),
        "attr" => Ok(attr(tree, &mut args)),
        "text" => Ok(text(tree, &mut args)),
        "children" => Ok(children(tree, &arg(&mut args, 0))),
        "elements" => Ok(elements(tree, &mut args)),
        "copy" => Ok(copy(tree, &mut args)),
        "count" => Ok(singleton(Value::Number(arg(&mut args, 0).len() as f64))),
        "empty" => Ok(singleton(Value::Bool(arg(&mut args, 0).is_empty()))),
        "distinct" => Ok(distinct(tree, &arg(&mut args, 0))),
        "sort" => sort(tree, ctx, &mut args),
        "concat" | "seq" => Ok(args.into_iter().flatten().collect()),
        "head" => Ok(arg(&mut args, 0).into_iter().next().into_iter().collect()),
        "tail" => {
            let mut seq = arg(&mut args, 0);
            if seq.is_empty() {
                Ok(empty())
            } else {
                Ok(seq.split_off(1))
            }
        }
        "last" => last(ctx, &mut args),
        "position" => Ok(singleton(Value::Number(ctx.position.position as f64))),
        "sum" => sum(tree, &mut args),
        "index" => index(tree, ctx, &mut args),
        "lookup" => lookup(tree, &mut args),
        "groupBy" => group_by(tree, ctx, &mut args),
        "apply" => apply(tree, ctx, &mut args),
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

fn arg(args: &mut Vec<Sequence>, index: usize) -> Sequence {
    if index < args.len() {
        std::mem::take(&mut args[index])
    } else {
        empty()
    }
}

fn type_of(seq: &Sequence) -> String {
    match seq.first() {
        Some(value) => crate::value::type_name(value).to_string(),
        None => "null".to_string(),
    }
}

fn node_name(tree: &Tree, seq: &Sequence) -> String {
    match seq.first() {
        Some(Value::Node(id)) => tree.get(*id).name.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

fn attr(tree: &Tree, args: &mut Vec<Sequence>) -> Sequence {
    let node_seq = arg(args, 0);
    let name_seq = arg(args, 1);
    let name = to_string(tree, &name_seq);
    match node_seq.first() {
        Some(Value::Node(id)) => match attribute_value(tree, *id, &name) {
            Some(value) => singleton(Value::Str(value)),
            None => singleton(Value::Absent),
        },
        _ => singleton(Value::Absent),
    }
}

/// `text(node)` (deep, the node's full string-value) or `text(node, false)`
/// (shallow: only the node's direct text children, concatenated).
fn text(tree: &Tree, args: &mut Vec<Sequence>) -> Sequence {
    let node_seq = arg(args, 0);
    let deep = if args.len() > 1 { to_boolean(&arg(args, 1)) } else { true };
    let Some(Value::Node(id)) = node_seq.first() else {
        return singleton(Value::Str(String::new()));
    };
    if deep {
        singleton(Value::Str(tree.string_value(*id)))
    } else {
        let node = tree.get(*id);
        let mut out = String::new();
        for &child in &node.children {
            if tree.get(child).kind == NodeKind::Text {
                out.push_str(tree.get(child).value.as_deref().unwrap_or(""));
            }
        }
        singleton(Value::Str(out))
    }
}

fn children(tree: &Tree, seq: &Sequence) -> Sequence {
    let mut out = Sequence::new();
    for item in seq {
        if let Value::Node(id) = item {
            out.extend(tree.get(*id).children.iter().copied().map(Value::Node));
        }
    }
    out
}

/// `elements(node)` (all child elements) or `elements(node, name)` (child
/// elements with that tag name only).
fn elements(tree: &Tree, args: &mut Vec<Sequence>) -> Sequence {
    let node_seq = arg(args, 0);
    let name_filter = if args.len() > 1 {
        let name_seq = arg(args, 1);
        Some(to_string(tree, &name_seq))
    } else {
        None
    };
    let mut out = Sequence::new();
    for item in &node_seq {
        let Value::Node(id) = item else { continue };
        for &child in &tree.get(*id).children {
            let node = tree.get(child);
            if node.kind != NodeKind::Element {
                continue;
            }
            if let Some(name) = &name_filter {
                if node.name.as_deref() != Some(name.as_str()) {
                    continue;
                }
            }
            out.push(Value::Node(child));
        }
    }
    out
}

/// `copy(node)` (deep) or `copy(node, false)` (shallow, no children).
fn copy(tree: &mut Tree, args: &mut Vec<Sequence>) -> Sequence {
    let node_seq = arg(args, 0);
    let recurse = if args.len() > 1 { to_boolean(&arg(args, 1)) } else { true };
    let mut out = Sequence::new();
    for item in node_seq {
        if let Value::Node(id) = item {
            out.push(Value::Node(tree.deep_copy(id, recurse)));
        }
    }
    out
}

/// First occurrence wins, keyed by each item's string coercion.
fn distinct(tree: &Tree, seq: &Sequence) -> Sequence {
    let mut seen = std::collections::HashSet::new();
    let mut out = Sequence::new();
    for item in seq {
        let key = to_string(tree, std::slice::from_ref(item));
        if seen.insert(key) {
            out.push(item.clone());
        }
    }
    out
}

/// `sort(seq)` (by string coercion) or `sort(seq, keyfn)` (by a user or
/// built-in function reference applied to each item). Stable.
fn sort(tree: &mut Tree, ctx: &EvalContext, args: &mut Vec<Sequence>) -> Result<Sequence, EvalError> {
    let seq = arg(args, 0);
    let keyfn = if args.len() > 1 { arg(args, 1).into_iter().next() } else { None };
    let mut keyed = Vec::with_capacity(seq.len());
    for item in seq {
        let key = match &keyfn {
            Some(Value::FuncRef(name)) => {
                let result = invoke_named(tree, ctx, name, vec![singleton(item.clone())])?;
                to_string(tree, &result)
            }
            _ => to_string(tree, std::slice::from_ref(&item)),
        };
        keyed.push((key, item));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

/// Bare `last()` (no arguments) reports the enclosing iteration's length;
/// `last(seq)` returns `seq`'s final item.
fn last(ctx: &EvalContext, args: &mut Vec<Sequence>) -> Result<Sequence, EvalError> {
    if args.is_empty() {
        return Ok(singleton(Value::Number(ctx.position.last as f64)));
    }
    Ok(arg(args, 0).into_iter().next_back().into_iter().collect())
}

fn sum(tree: &Tree, args: &mut Vec<Sequence>) -> Result<Sequence, EvalError> {
    let seq = arg(args, 0);
    let mut total = 0.0;
    for item in &seq {
        total += to_number(tree, std::slice::from_ref(item))?;
    }
    Ok(singleton(Value::Number(total)))
}

fn key_of(tree: &mut Tree, ctx: &EvalContext, keyfn: &Option<Value>, item: &Value) -> Result<String, EvalError> {
    match keyfn {
        Some(Value::FuncRef(name)) => {
            let result = invoke_named(tree, ctx, name, vec![singleton(item.clone())])?;
            Ok(to_string(tree, &result))
        }
        _ => Ok(to_string(tree, std::slice::from_ref(item))),
    }
}

/// `index(seq)` (keyed by string coercion) or `index(seq, keyfn)`: builds a
/// map from key to the sequence of items sharing that key, insertion order
/// preserved for both keys and items.
fn index(tree: &mut Tree, ctx: &EvalContext, args: &mut Vec<Sequence>) -> Result<Sequence, EvalError> {
    let seq = arg(args, 0);
    let keyfn = if args.len() > 1 { arg(args, 1).into_iter().next() } else { None };
    let mut map = MapValue::new();
    for item in seq {
        let key = key_of(tree, ctx, &keyfn, &item)?;
        map.push_item(key, item);
    }
    Ok(singleton(Value::Map(Rc::new(map))))
}

/// `lookup(map, key)`: the sequence stored under `key`, or the empty
/// sequence if absent.
fn lookup(tree: &Tree, args: &mut Vec<Sequence>) -> Sequence {
    let map_seq = arg(args, 0);
    let key_seq = arg(args, 1);
    let key = to_string(tree, &key_seq);
    match map_seq.first() {
        Some(Value::Map(map)) => map.get(&key).cloned().unwrap_or_default(),
        _ => empty(),
    }
}

/// `groupBy(seq, keyfn)`: a sequence of `{key, items}` maps, one per
/// distinct key, in first-seen order.
fn group_by(tree: &mut Tree, ctx: &EvalContext, args: &mut Vec<Sequence>) -> Result<Sequence, EvalError> {
    let seq = arg(args, 0);
    let keyfn = arg(args, 1).into_iter().next();
    let mut order = Vec::new();
    let mut groups: std::collections::HashMap<String, Sequence> = std::collections::HashMap::new();
    for item in seq {
        let key = key_of(tree, ctx, &keyfn, &item)?;
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(item);
    }
    let mut out = Sequence::new();
    for key in order {
        let items = groups.remove(&key).unwrap_or_default();
        let mut group_map = MapValue::new();
        group_map.insert("key".to_string(), singleton(Value::Str(key)));
        group_map.insert("items".to_string(), items);
        out.push(Value::Map(Rc::new(group_map)));
    }
    Ok(out)
}

/// `apply(seq)` (default rule set `"main"`) or `apply(seq, ruleSetName)`:
/// dispatches every item to the first matching rule, concatenating results.
fn apply(tree: &mut Tree, ctx: &EvalContext, args: &mut Vec<Sequence>) -> Result<Sequence, EvalError> {
    let seq = arg(args, 0);
    let rule_set = if args.len() > 1 {
        to_string(tree, &arg(args, 1))
    } else {
        "main".to_string()
    };
    let mut out = Sequence::new();
    for item in seq {
        out.extend(apply_rule(tree, ctx, &item, &rule_set)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xform_ast::Module;
    use xform_xml::load_document;

    fn ctx(module: &Module) -> EvalContext<'_> {
        use crate::context::ModuleTables;
        let tables = Box::leak(Box::new(ModuleTables::new(module)));
        EvalContext::new(tables, None)
    }

    #[test]
    fn count_and_empty_agree_on_node_set_size() {
        let module = Module::default();
        let (mut tree, doc) = load_document("<root><a/><b/></root>").unwrap();
        let c = ctx(&module);
        let root = tree.get(doc).children[0];
        let kids = children(&tree, &vec![Value::Node(root)]);
        let mut args = vec![kids.clone()];
        let counted = call_builtin(&mut tree, &c, "count", args.clone()).unwrap();
        assert_eq!(counted, vec![Value::Number(2.0)]);
        let is_empty = call_builtin(&mut tree, &c, "empty", std::mem::take(&mut args)).unwrap();
        assert_eq!(is_empty, vec![Value::Bool(false)]);
    }

    #[test]
    fn distinct_keeps_first_occurrence() {
        let tree = Tree::new();
        let seq = vec![Value::Number(1.0), Value::Number(2.0), Value::Number(1.0)];
        let result = distinct(&tree, &seq);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn sort_by_string_coercion_is_stable_and_ascending() {
        let module = Module::default();
        let mut tree = Tree::new();
        let c = ctx(&module);
        let mut args = vec![vec![Value::Str("b".into()), Value::Str("a".into())]];
        let sorted = sort(&mut tree, &c, &mut args).unwrap();
        assert_eq!(sorted, vec![Value::Str("a".into()), Value::Str("b".into())]);
    }

    #[test]
    fn index_groups_items_sharing_a_key() {
        let module = Module::default();
        let mut tree = Tree::new();
        let c = ctx(&module);
        let mut args = vec![vec![Value::Str("x".into()), Value::Str("x".into()), Value::Str("y".into())]];
        let result = index(&mut tree, &c, &mut args).unwrap();
        let Value::Map(map) = &result[0] else { panic!("expected a map") };
        assert_eq!(map.get("x").unwrap().len(), 2);
        assert_eq!(map.get("y").unwrap().len(), 1);
    }

    #[test]
    fn missing_required_argument_raises_dynamic_type_error() {
        let module = Module::default();
        let mut tree = Tree::new();
        let c = ctx(&module);
        assert!(call_builtin(&mut tree, &c, "attr", vec![vec![Value::Bool(true)]]).is_err());
        assert!(call_builtin(&mut tree, &c, "lookup", vec![empty()]).is_err());
        assert!(call_builtin(&mut tree, &c, "groupBy", Vec::new()).is_err());
    }

    #[test]
    fn extra_argument_beyond_max_arity_raises_dynamic_type_error() {
        let module = Module::default();
        let mut tree = Tree::new();
        let c = ctx(&module);
        let args = vec![empty(), empty(), empty()];
        assert!(call_builtin(&mut tree, &c, "text", args).is_err());
    }

    #[test]
    fn variadic_seq_accepts_any_argument_count() {
        let module = Module::default();
        let mut tree = Tree::new();
        let c = ctx(&module);
        assert!(call_builtin(&mut tree, &c, "seq", Vec::new()).is_ok());
        let many = vec![singleton(Value::Number(1.0)); 5];
        assert!(call_builtin(&mut tree, &c, "seq", many).is_ok());
    }
}
