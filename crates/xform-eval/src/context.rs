//! Evaluation context.
//!
//! Generalizes `petty_xpath1::engine::EvaluationContext` (context node,
//! root, variables, position/size, function table) from an XPath
//! predicate's read-only scope to XForm's richer scoping forms: `let`,
//! `for`, function calls, predicates and rule bodies all derive a fresh
//! context rather than mutating one in place, matching how
//! "construct a new `EvaluationContext` per predicate" pattern in
//! `apply_predicates`.

use std::collections::HashMap;
use std::rc::Rc;

use xform_ast::{FunctionDef, Module, RuleDef};
use xform_xml::NodeId;

use crate::value::Sequence;

/// Shared, immutable module tables: functions, rule sets, namespaces. One
/// instance backs every context derived during a single `eval_module` run.
pub struct ModuleTables<'m> {
    pub module: &'m Module,
}

impl<'m> ModuleTables<'m> {
    pub fn new(module: &'m Module) -> Self {
        ModuleTables { module }
    }

    pub fn function(&self, name: &str) -> Option<&'m FunctionDef> {
        self.module.functions.get(name)
    }

    pub fn rule_set(&self, name: &str) -> Option<&'m [RuleDef]> {
        self.module.rules.get(name).map(Vec::as_slice)
    }
}

/// The variable environment: name to bound sequence. Cloned (shallow, via
/// `Rc`) on every scope entry so a callee can never mutate a caller's
/// bindings — contexts are never mutated in place.
#[derive(Clone, Default)]
pub struct Env {
    vars: Rc<HashMap<String, Sequence>>,
}

impl Env {
    pub fn get(&self, name: &str) -> Option<&Sequence> {
        self.vars.get(name)
    }

    /// Returns a new environment with `name` bound to `value`, leaving
    /// `self` untouched.
    pub fn with(&self, name: impl Into<String>, value: Sequence) -> Env {
        let mut map = (*self.vars).clone();
        map.insert(name.into(), value);
        Env { vars: Rc::new(map) }
    }
}

/// The positional pair carried through `for`-iteration and predicate
/// evaluation: 1-based `position`, and `last` (the pre-filter length of
/// the sequence being iterated).
#[derive(Clone, Copy, Debug)]
pub struct Position {
    pub position: usize,
    pub last: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position { position: 1, last: 1 }
    }
}

/// One evaluation context. Never mutated in place — every scoping form
/// builds a derived copy via [`EvalContext::with_item`],
/// [`EvalContext::with_var`], or [`EvalContext::with_position`].
///
/// `globals` holds the module-level `var` bindings only, fixed for the
/// whole run. User functions and rule bodies are not closures — a call
/// starts from `globals`, not from the caller's local `env` — so `let`/`for`
/// locals never leak into a callee, while top-level `var`s stay visible
/// everywhere (see DESIGN.md's function-scoping decision).
#[derive(Clone)]
pub struct EvalContext<'m> {
    pub tables: &'m ModuleTables<'m>,
    pub item: Option<NodeId>,
    pub env: Env,
    pub globals: Env,
    pub position: Position,
}

impl<'m> EvalContext<'m> {
    pub fn new(tables: &'m ModuleTables<'m>, item: Option<NodeId>) -> Self {
        EvalContext {
            tables,
            item,
            env: Env::default(),
            globals: Env::default(),
            position: Position::default(),
        }
    }

    pub fn with_item(&self, item: Option<NodeId>) -> Self {
        EvalContext { item, ..self.clone() }
    }

    pub fn with_var(&self, name: impl Into<String>, value: Sequence) -> Self {
        EvalContext { env: self.env.with(name, value), ..self.clone() }
    }

    pub fn with_position(&self, position: usize, last: usize) -> Self {
        EvalContext { position: Position { position, last }, ..self.clone() }
    }

    /// Promotes the current `env` to `globals`, used once after module
    /// variables finish binding in `eval_module`.
    pub fn freeze_globals(&self) -> Self {
        EvalContext { globals: self.env.clone(), ..self.clone() }
    }

    /// A fresh, isolated scope for a user function call or rule body: sees
    /// only module globals plus whatever the caller binds afterward via
    /// `with_var`, not the caller's local `let`/`for` bindings.
    pub fn isolated_scope(&self, item: Option<NodeId>) -> Self {
        EvalContext {
            tables: self.tables,
            item,
            env: self.globals.clone(),
            globals: self.globals.clone(),
            position: Position::default(),
        }
    }
}
