//! The evaluator's universal value domain.
//!
//! Shaped after `petty_xpath1::engine::XPathValue`, generalized from its
//! four-variant node-set/string/number/boolean domain to the seven item
//! kinds a sequence can hold. Unlike `petty_xpath1::XPathValue`, sequences here are
//! heterogeneous and every operation treats a scalar as a length-1
//! sequence rather than keeping a separate `XPathValue` sum type.

use std::rc::Rc;

use xform_xml::NodeId;

/// One item in a [`Sequence`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Node(NodeId),
    Bool(bool),
    Number(f64),
    Str(String),
    /// An insertion-ordered string-keyed map, produced by `index`/`groupBy`
    /// and consumed by `lookup`. `Rc`-wrapped so cloning a sequence that
    /// carries a map stays O(1).
    Map(Rc<MapValue>),
    /// A first-class reference to a callable, captured by name only (see
    /// DESIGN.md on why name capture is sufficient for `sort`/`index`/`groupBy`).
    FuncRef(String),
    /// The absent marker: distinct from an empty sequence when it appears
    /// as an item (e.g. a step onto a node with no such attribute, lifted
    /// to a one-item placeholder only where the built-in table calls for it).
    Absent,
}

/// An insertion-ordered string-keyed map of sequences, backed by a plain
/// `Vec` of pairs rather than an extra map-crate dependency — the same
/// judgment `petty_xpath1`'s axis collectors make, reaching for `Vec`/`HashSet`
/// combinations ahead of a dedicated ordered-map crate for similarly small
/// collections (see DESIGN.md).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapValue(Vec<(String, Sequence)>);

impl MapValue {
    pub fn new() -> Self {
        MapValue(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&Sequence> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Inserts or replaces the sequence bound to `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: Sequence) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Appends `item` to the sequence bound to `key`, creating the key with
    /// an empty sequence first if it isn't present yet.
    pub fn push_item(&mut self, key: impl Into<String>, item: Value) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1.push(item),
            None => self.0.push((key, vec![item])),
        }
    }
}

/// The evaluator's universal value type: an ordered, possibly
/// heterogeneous list of items. Every operation is eager.
pub type Sequence = Vec<Value>;

pub fn singleton(value: Value) -> Sequence {
    vec![value]
}

pub fn empty() -> Sequence {
    Vec::new()
}

/// Tag used by the `typeOf` built-in.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Node(_) => "node",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::Str(_) => "string",
        Value::Map(_) => "map",
        Value::FuncRef(_) => "string",
        Value::Absent => "null",
    }
}
