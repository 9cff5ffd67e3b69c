//! Documents and collections.
//!
//! A [Document] is a schema-less ordered mapping of attributes. A
//! [Collection] is a named group of documents inside the store; collections
//! come into existence through the [CollectionRegistry], either on the first
//! write that references them or eagerly from a startup manifest.

mod document;
mod registry;

pub use document::*;
pub use registry::*;
