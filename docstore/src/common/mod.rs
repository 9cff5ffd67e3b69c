//! Shared types: document values, constants, named locks and clock helpers.

mod constants;
mod lock;
mod time;
mod value;

pub use constants::*;
pub use lock::*;
pub use time::*;
pub use value::*;
