//! Evaluator error taxonomy.
//!
//! Modeled on `petty_xslt::error::XsltError`: a flat `thiserror` enum with
//! the fixed diagnostic codes the language spec defines (`XFST0003`,
//! `XFDY0001`, `XFDY0002`) alongside a catch-all runtime error for
//! unclassified dynamic failures. Unlike `petty_xpath1`'s XPath errors, these
//! never carry a source position — evaluation errors are reported against
//! the AST node that failed, not a byte offset.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// `XFST0003`: a function call named a built-in that does not exist
    /// and no matching user function is defined.
    #[error("XFST0003: unknown function '{0}'")]
    UnknownFunction(String),

    /// `XFDY0001`: a `match` expression had no matching case and no
    /// `default`, or `apply` found no matching rule for an item.
    #[error("XFDY0001: no matching {0}")]
    NoMatch(&'static str),

    /// `XFDY0002`: a dynamic type error — failed number coercion, wrong
    /// arity, or a missing required argument.
    #[error("XFDY0002: {0}")]
    DynamicType(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Xml(#[from] xform_xml::XmlError),
}

impl EvalError {
    pub fn arity(func: &str, expected: usize, got: usize) -> Self {
        EvalError::DynamicType(format!(
            "{func} expects at most {expected} argument(s), got {got}"
        ))
    }

    /// Reports a built-in call whose argument count falls outside its
    /// spec-fixed `(min, max)` arity; `max == None` means no upper bound.
    pub fn arity_range(func: &str, min: usize, max: Option<usize>, got: usize) -> Self {
        let expected = match max {
            Some(max) if max == min => format!("exactly {min} argument(s)"),
            Some(max) => format!("between {min} and {max} argument(s)"),
            None => format!("at least {min} argument(s)"),
        };
        EvalError::DynamicType(format!("{func} expects {expected}, got {got}"))
    }

    pub fn missing_arg(func: &str, param: &str) -> Self {
        EvalError::DynamicType(format!("{func}: missing required argument '{param}'"))
    }

    pub fn number_parse(text: &str) -> Self {
        EvalError::DynamicType(format!("cannot convert '{text}' to a number"))
    }
}
