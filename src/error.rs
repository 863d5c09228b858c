//! The crate-integration error type tying the four subsystem error types
//! together, in the shape of `petty`'s root `PipelineError`
//! (`src/error.rs`) and `crates/xslt/src/error.rs::XsltError`: one variant
//! per subsystem, `#[from]` conversions from each subsystem's own error
//! type, and a catch-all for unclassified runtime failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum XformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] xform_xml::XmlError),

    #[error("syntax error: {0}")]
    Parse(#[from] xform_lang::ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] xform_eval::EvalError),

    #[error("{0}")]
    Other(String),
}
