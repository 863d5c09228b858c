//! The four-stage pipeline: load XML, parse the module, evaluate, serialize.
//!
//! Mirrors `petty`'s `PipelineBuilder`/`Pipeline` split (`src/pipeline`)
//! in spirit — one function that strings the stages together and logs at
//! each boundary — but collapsed to a single free function since the XForm
//! pipeline has no builder-configurable stages, just the fixed sequence the
//! spec's System Overview lays out.

use xform_eval::Value;
use xform_xml::serialize_node;

use crate::error::XformError;

/// Runs the full pipeline over `xml_source` and `module_source`, returning
/// the serialized output fragment.
pub fn run(xml_source: &str, module_source: &str) -> Result<String, XformError> {
    let (mut tree, doc) = xform_xml::load_document(xml_source)?;
    log::debug!("document loaded, {} bytes of input XML", xml_source.len());

    let module = xform_lang::parse_module(module_source)?;
    log::debug!("module parsed from {} bytes of source", module_source.len());

    let result = xform_eval::eval_module(&mut tree, &module, doc)?;
    log::debug!("evaluation finished, {} item(s) in result sequence", result.len());

    let mut out = String::new();
    for item in &result {
        match item {
            Value::Node(id) => out.push_str(&serialize_node(&tree, *id)),
            other => out.push_str(&xform_eval::to_string(&tree, std::slice::from_ref(other))),
        }
    }
    log::debug!("serialized output is {} bytes", out.len());
    Ok(out)
}
