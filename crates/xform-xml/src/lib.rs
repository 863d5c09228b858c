//! Arena-based XML tree model: the loader, node storage, and serializer
//! shared by every other `xform-*` crate.

pub mod load;
pub mod node;
pub mod serialize;

pub use load::{load_document, XmlError};
pub use node::{NodeId, NodeKind, Tree, XmlNode};
pub use serialize::serialize_node;
