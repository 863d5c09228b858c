//! The expression evaluator.
//!
//! One big `match` over `xform_ast::Expr`, in the same shape as the
//! teacher's `petty_xpath1::engine::evaluate` — every arm dispatches to a
//! focused helper (path navigation to `path::eval_path`, function calls to
//! `builtins`/user functions, pattern dispatch to `pattern::matches`).
//! Scoping forms (`let`, `for`, `match`, function calls, rule bodies) never
//! mutate a context; each derives a fresh one via `EvalContext::with_*`.

use xform_ast::{BinaryOp, Expr, Literal, Module, UnaryOp};
use xform_xml::{NodeId, Tree};

use crate::builtins;
use crate::coerce::{to_boolean, to_number, to_string};
use crate::context::{EvalContext, ModuleTables};
use crate::error::EvalError;
use crate::path;
use crate::pattern;
use crate::value::{empty, singleton, Sequence, Value};

/// Evaluates a whole module against `doc`: binds module-level `var`s in
/// source order (each initializer sees the ones bound before it), then
/// evaluates the top-level expression, or returns the empty sequence if the
/// module has none (a module can be pure declarations, e.g. a rule library
/// meant to be `apply`-ed from elsewhere).
pub fn eval_module(tree: &mut Tree, module: &Module, doc: NodeId) -> Result<Sequence, EvalError> {
    log::debug!(
        "evaluation started: {} function(s), {} rule set(s), {} module var(s)",
        module.functions.len(),
        module.rules.len(),
        module.vars.len()
    );
    let tables = ModuleTables::new(module);
    let mut ctx = EvalContext::new(&tables, Some(doc));
    for (name, init) in &module.vars {
        let value = eval_expr(tree, &ctx, init)?;
        ctx = ctx.with_var(name.clone(), value);
    }
    ctx = ctx.freeze_globals();
    let result = match &module.expr {
        Some(expr) => eval_expr(tree, &ctx, expr),
        None => Ok(empty()),
    }?;
    log::debug!("evaluation finished: {} item(s) in result sequence", result.len());
    Ok(result)
}

pub fn eval_expr(tree: &mut Tree, ctx: &EvalContext, expr: &Expr) -> Result<Sequence, EvalError> {
    match expr {
        Expr::Literal(Literal::Number(n)) => Ok(singleton(Value::Number(*n))),
        Expr::Literal(Literal::Str(s)) => Ok(singleton(Value::Str(s.clone()))),

        Expr::VarRef(name) => eval_var_ref(tree, ctx, name),

        Expr::If { cond, then_branch, else_branch } => {
            let c = eval_expr(tree, ctx, cond)?;
            if to_boolean(&c) {
                eval_expr(tree, ctx, then_branch)
            } else {
                eval_expr(tree, ctx, else_branch)
            }
        }

        Expr::Let { name, value, body } => {
            let bound = eval_expr(tree, ctx, value)?;
            let inner = ctx.with_var(name.clone(), bound);
            eval_expr(tree, &inner, body)
        }

        Expr::For { name, seq, where_clause, body } => {
            eval_for(tree, ctx, name, seq, where_clause.as_deref(), body)
        }

        Expr::Match { target, cases, default } => eval_match(tree, ctx, target, cases, default.as_deref()),

        Expr::FuncCall { name, args } => eval_call(tree, ctx, name, args),

        Expr::Unary { op, expr } => {
            let v = eval_expr(tree, ctx, expr)?;
            match op {
                UnaryOp::Not => Ok(singleton(Value::Bool(!to_boolean(&v)))),
                UnaryOp::Neg => Ok(singleton(Value::Number(-to_number(tree, &v)?))),
            }
        }

        Expr::Binary { op, left, right } => eval_binary(tree, ctx, *op, left, right),

        Expr::Path(path_expr) => {
            let nodes = path::eval_path(tree, ctx, path_expr)?;
            Ok(nodes.into_iter().map(Value::Node).collect())
        }

        Expr::Constructor(ctor) => eval_constructor(tree, ctx, ctor),

        Expr::TextConstructor(inner) => {
            let v = eval_expr(tree, ctx, inner)?;
            let text = to_string(tree, &v);
            // Unparented until an enclosing constructor attaches it — same
            // convention as `Tree::deep_copy`.
            let id = tree.new_text(None, text);
            Ok(singleton(Value::Node(id)))
        }

        Expr::Text(literal) => {
            let id = tree.new_text(None, literal.clone());
            Ok(singleton(Value::Node(id)))
        }

        Expr::Interp(inner) => eval_expr(tree, ctx, inner),
    }
}

/// Resolves a bare identifier in a fixed order: a bound
/// variable, then a zero-argument function reference, then an implicit
/// child-axis step from the context item, and finally the empty sequence.
fn eval_var_ref(tree: &mut Tree, ctx: &EvalContext, name: &str) -> Result<Sequence, EvalError> {
    if let Some(seq) = ctx.env.get(name) {
        return Ok(seq.clone());
    }
    if ctx.tables.function(name).is_some() || builtins::is_builtin(name) {
        return Ok(singleton(Value::FuncRef(name.to_string())));
    }
    let path_expr = xform_ast::PathExpr {
        start: xform_ast::PathStart::Var(name.to_string()),
        steps: Vec::new(),
    };
    let nodes = path::eval_path(tree, ctx, &path_expr)?;
    Ok(nodes.into_iter().map(Value::Node).collect())
}

fn eval_for(
    tree: &mut Tree,
    ctx: &EvalContext,
    name: &str,
    seq_expr: &Expr,
    where_clause: Option<&Expr>,
    body: &Expr,
) -> Result<Sequence, EvalError> {
    let items = eval_expr(tree, ctx, seq_expr)?;
    let last = items.len();
    let mut out = Sequence::new();
    for (i, item) in items.into_iter().enumerate() {
        let item_node = as_node(&item);
        let per_item = ctx
            .with_item(item_node.or(ctx.item))
            .with_position(i + 1, last)
            .with_var(name.to_string(), singleton(item));
        if let Some(cond) = where_clause {
            let keep = eval_expr(tree, &per_item, cond)?;
            if !to_boolean(&keep) {
                continue;
            }
        }
        out.extend(eval_expr(tree, &per_item, body)?);
    }
    Ok(out)
}

fn eval_match(
    tree: &mut Tree,
    ctx: &EvalContext,
    target: &Expr,
    cases: &[(xform_ast::Pattern, Expr)],
    default: Option<&Expr>,
) -> Result<Sequence, EvalError> {
    let items = eval_expr(tree, ctx, target)?;
    let mut out = Sequence::new();
    for item in items {
        let item_node = as_node(&item);
        let mut matched = false;
        for (pattern, body) in cases {
            if let Some(bindings) = pattern::matches(tree, &item, pattern) {
                let mut case_ctx = ctx.with_item(item_node.or(ctx.item));
                for (var_name, value) in bindings {
                    case_ctx = case_ctx.with_var(var_name, value);
                }
                out.extend(eval_expr(tree, &case_ctx, body)?);
                matched = true;
                break;
            }
        }
        if !matched {
            match default {
                Some(body) => {
                    let default_ctx = ctx.with_item(item_node.or(ctx.item));
                    out.extend(eval_expr(tree, &default_ctx, body)?);
                }
                None => return Err(EvalError::NoMatch("case")),
            }
        }
    }
    Ok(out)
}

fn as_node(value: &Value) -> Option<NodeId> {
    match value {
        Value::Node(id) => Some(*id),
        _ => None,
    }
}

fn eval_binary(tree: &mut Tree, ctx: &EvalContext, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Sequence, EvalError> {
    if op.short_circuits() {
        let l = eval_expr(tree, ctx, left)?;
        let l_bool = to_boolean(&l);
        return match op {
            BinaryOp::And => {
                if !l_bool {
                    Ok(singleton(Value::Bool(false)))
                } else {
                    let r = eval_expr(tree, ctx, right)?;
                    Ok(singleton(Value::Bool(to_boolean(&r))))
                }
            }
            BinaryOp::Or => {
                if l_bool {
                    Ok(singleton(Value::Bool(true)))
                } else {
                    let r = eval_expr(tree, ctx, right)?;
                    Ok(singleton(Value::Bool(to_boolean(&r))))
                }
            }
            _ => unreachable!(),
        };
    }

    let l = eval_expr(tree, ctx, left)?;
    let r = eval_expr(tree, ctx, right)?;
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            // Equality atomizes both sides to a string and compares — the
            // the same coercion rule applied to nodes, numbers and strings
            // alike, so `1 = "1"` and a text node holding `"1"` all agree.
            let eq = to_string(tree, &l) == to_string(tree, &r);
            Ok(singleton(Value::Bool(if op == BinaryOp::Eq { eq } else { !eq })))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ln = to_number(tree, &l)?;
            let rn = to_number(tree, &r)?;
            let result = match op {
                BinaryOp::Lt => ln < rn,
                BinaryOp::Le => ln <= rn,
                BinaryOp::Gt => ln > rn,
                BinaryOp::Ge => ln >= rn,
                _ => unreachable!(),
            };
            Ok(singleton(Value::Bool(result)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let ln = to_number(tree, &l)?;
            let rn = to_number(tree, &r)?;
            let result = match op {
                BinaryOp::Add => ln + rn,
                BinaryOp::Sub => ln - rn,
                BinaryOp::Mul => ln * rn,
                BinaryOp::Div => ln / rn,
                BinaryOp::Mod => ln % rn,
                _ => unreachable!(),
            };
            Ok(singleton(Value::Number(result)))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled by the short-circuit branch above"),
    }
}

fn eval_call(tree: &mut Tree, ctx: &EvalContext, name: &str, arg_exprs: &[Expr]) -> Result<Sequence, EvalError> {
    let mut args = Vec::with_capacity(arg_exprs.len());
    for arg in arg_exprs {
        args.push(eval_expr(tree, ctx, arg)?);
    }
    invoke_named(tree, ctx, name, args)
}

/// Invokes a callable by name — a user function, falling back to the
/// built-in table — against already-evaluated argument sequences. Shared by
/// direct `FuncCall` evaluation and by the built-ins (`sort`, `index`,
/// `groupBy`) that accept a function reference as a key selector.
pub(crate) fn invoke_named(
    tree: &mut Tree,
    ctx: &EvalContext,
    name: &str,
    args: Vec<Sequence>,
) -> Result<Sequence, EvalError> {
    if let Some(def) = ctx.tables.function(name) {
        return call_user_function(tree, ctx, name, def, args);
    }
    builtins::call_builtin(tree, ctx, name, args)
}

fn call_user_function(
    tree: &mut Tree,
    ctx: &EvalContext,
    name: &str,
    def: &xform_ast::FunctionDef,
    mut args: Vec<Sequence>,
) -> Result<Sequence, EvalError> {
    if args.len() > def.params.len() {
        return Err(EvalError::arity(name, def.params.len(), args.len()));
    }
    // Missing trailing arguments fall back to their declared default,
    // evaluated in the caller's context: defaults are
    // evaluated in the caller's context at call time."
    while args.len() < def.params.len() {
        let param = &def.params[args.len()];
        let default_value = match &param.default {
            Some(default_expr) => eval_expr(tree, ctx, default_expr)?,
            None => return Err(EvalError::missing_arg(name, &param.name)),
        };
        args.push(default_value);
    }

    // A user function is not a closure: it runs with module globals plus
    // its own parameters, never the caller's local `let`/`for` bindings.
    let mut call_ctx = ctx.isolated_scope(None);
    for (param, value) in def.params.iter().zip(args) {
        call_ctx = call_ctx.with_var(param.name.clone(), value);
    }
    eval_expr(tree, &call_ctx, &def.body)
}

/// Dispatches `item` to the first matching rule in `rule_set_name` (default
/// `"main"`), running the body in an isolated scope seeded with the
/// pattern's bindings. Used by the `apply` built-in.
pub(crate) fn apply_rule(
    tree: &mut Tree,
    ctx: &EvalContext,
    item: &Value,
    rule_set_name: &str,
) -> Result<Sequence, EvalError> {
    let rules = ctx
        .tables
        .rule_set(rule_set_name)
        .ok_or(EvalError::NoMatch("rule"))?;
    for rule in rules {
        if let Some(bindings) = pattern::matches(tree, item, &rule.pattern) {
            let mut rule_ctx = ctx.isolated_scope(as_node(item));
            for (name, value) in bindings {
                rule_ctx = rule_ctx.with_var(name, value);
            }
            return eval_expr(tree, &rule_ctx, &rule.body);
        }
    }
    log::trace!("rule dispatch found no matching rule in rule set '{rule_set_name}'");
    Err(EvalError::NoMatch("rule"))
}

fn eval_constructor(tree: &mut Tree, ctx: &EvalContext, ctor: &xform_ast::Constructor) -> Result<Sequence, EvalError> {
    // Unparented until an enclosing constructor (or the caller) attaches
    // it — same convention as `Tree::deep_copy`.
    let element = tree.new_element(None, ctor.name.clone());
    for (attr_name, attr_expr) in &ctor.attrs {
        let value = eval_expr(tree, ctx, attr_expr)?;
        let text = to_string(tree, &value);
        tree.set_attr(element, attr_name.clone(), text);
    }
    for content in &ctor.contents {
        let produced = eval_expr(tree, ctx, content)?;
        for item in produced {
            attach_content(tree, element, item);
        }
    }
    Ok(singleton(Value::Node(element)))
}

/// Appends one produced item to a constructor's output element: nodes are
/// deep-copied so the new tree never shares identity with its source, and
/// atomic values are stringified into a fresh text node.
fn attach_content(tree: &mut Tree, parent: NodeId, item: Value) {
    match item {
        Value::Node(id) => {
            let copy = tree.deep_copy(id, true);
            tree.get_mut(copy).parent = Some(parent);
            tree.append_child(parent, copy);
        }
        other => {
            let text = match other {
                Value::Bool(b) => if b { "true" } else { "false" }.to_string(),
                Value::Number(n) => crate::coerce::format_number(n),
                Value::Str(s) => s,
                Value::FuncRef(s) => s,
                Value::Absent | Value::Map(_) => return,
                Value::Node(_) => unreachable!(),
            };
            let text_id = tree.new_text(Some(parent), text);
            tree.append_child(parent, text_id);
        }
    }
}
