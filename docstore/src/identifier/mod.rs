//! Identifier policies.
//!
//! A document's external identifier is the reserved `id` attribute. It is
//! never the internal storage position itself; [IdentifierPolicy] decides how
//! the two relate and how a client supplied path id is validated.

mod policy;
mod snowflake;
mod token;

pub use policy::*;
pub use snowflake::*;
pub use token::*;
