mod collection;
mod store;

pub(crate) use collection::*;
pub use store::*;
