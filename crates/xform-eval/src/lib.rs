//! Tree-walking evaluator for the XForm language.
//!
//! Wires the sequence value domain ([`value`]), scoping ([`context`]), path
//! navigation ([`path`]), pattern matching ([`pattern`]), the built-in
//! function library ([`builtins`]) and the main expression evaluator
//! ([`eval`]) into one public entry point, [`eval_module`].

mod builtins;
mod coerce;
mod context;
mod error;
mod eval;
mod path;
mod pattern;
mod value;

pub use coerce::{to_boolean, to_number, to_string};
pub use context::{EvalContext, ModuleTables};
pub use error::EvalError;
pub use eval::{eval_expr, eval_module};
pub use value::{empty, singleton, type_name, MapValue, Sequence, Value};
