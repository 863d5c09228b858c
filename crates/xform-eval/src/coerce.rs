//! Sequence coercions: `to_boolean`, `to_string`, `to_number`.
//!
//! Mirrors `petty_xpath1::XPathValue`'s `to_bool`/`to_number`/`Display`
//! (`petty_xpath1::engine`), generalized from a 4-variant scalar domain to
//! XForm's heterogeneous sequences, where only the first item participates
//! in string/number coercion but *any* node anywhere in the sequence makes
//! it boolean-true.

use xform_xml::Tree;

use crate::error::EvalError;
use crate::value::{Sequence, Value};

pub fn to_boolean(seq: &Sequence) -> bool {
    if seq.is_empty() {
        return false;
    }
    if seq.iter().any(|v| matches!(v, Value::Node(_))) {
        return true;
    }
    match &seq[0] {
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Absent => false,
        Value::Node(_) => true,
        Value::Map(_) | Value::FuncRef(_) => true,
    }
}

/// Formats a finite `f64` without a trailing `.0` for integral values:
/// integral values print with no decimal point (`1`, not `1.0`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.fract() == 0.0 && n.is_finite() {
        return format!("{}", n as i64);
    }
    n.to_string()
}

pub fn to_string(tree: &Tree, seq: &Sequence) -> String {
    let Some(first) = seq.first() else {
        return String::new();
    };
    match first {
        Value::Node(id) => tree.string_value(*id),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Str(s) => s.clone(),
        Value::FuncRef(name) => name.clone(),
        Value::Absent => String::new(),
        Value::Map(_) => String::new(),
    }
}

pub fn to_number(tree: &Tree, seq: &Sequence) -> Result<f64, EvalError> {
    let Some(first) = seq.first() else {
        return Ok(0.0);
    };
    match first {
        Value::Number(n) => Ok(*n),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Node(id) => {
            let text = tree.string_value(*id);
            parse_number(&text)
        }
        Value::Str(s) => parse_number(s),
        Value::Absent => Ok(0.0),
        Value::Map(_) | Value::FuncRef(_) => Err(EvalError::number_parse("<non-atomic value>")),
    }
}

fn parse_number(text: &str) -> Result<f64, EvalError> {
    text.trim().parse::<f64>().map_err(|_| EvalError::number_parse(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_format_without_decimal() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(1.5), "1.5");
    }

    #[test]
    fn empty_sequence_coerces_to_falsy_defaults() {
        let seq: Sequence = Vec::new();
        assert!(!to_boolean(&seq));
        let tree = Tree::new();
        assert_eq!(to_string(&tree, &seq), "");
        assert_eq!(to_number(&tree, &seq).unwrap(), 0.0);
    }

    #[test]
    fn falsy_atomics_match_spec_list() {
        assert!(!to_boolean(&vec![Value::Bool(false)]));
        assert!(!to_boolean(&vec![Value::Number(0.0)]));
        assert!(!to_boolean(&vec![Value::Str(String::new())]));
        assert!(to_boolean(&vec![Value::Str("0".to_string())]));
    }
}
