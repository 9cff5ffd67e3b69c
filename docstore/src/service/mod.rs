//! The CRUD service, its builder and the mapping of outcomes to statuses.

mod builder;
mod crud_service;
mod status;

pub use builder::*;
pub use crud_service::*;
pub use status::*;
