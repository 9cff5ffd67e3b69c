//! Query translation: identifier and attribute lookups as store queries.

mod translator;

pub use translator::*;
