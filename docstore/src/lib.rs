//! # docstore - schema-less CRUD over named document collections
//!
//! docstore manages named collections of JSON-like documents on top of an
//! embedded document store with secondary indexes and equality queries.
//!
//! ## Key Features
//!
//! - **Ensure-exists collections**: a collection and its `id` index are
//!   created on first write or from a startup manifest; repeated or concurrent
//!   references are harmless
//! - **Stable identifiers**: every document carries an external `id` distinct
//!   from its internal storage position, chosen by an [identifier::IdentifierPolicy]
//! - **Index-backed lookup**: documents are found by evaluating an equality
//!   query against the `id` index
//! - **Pluggable storage**: an in-memory store ships here; `docstore-fjall-adapter`
//!   provides a persistent one
//!
//! ## Quick Start
//!
//! ```rust
//! use docstore::identifier::PolicyKind;
//! use docstore::service::CrudService;
//!
//! # fn main() -> Result<(), docstore::errors::DocStoreError> {
//! let service = CrudService::builder()
//!     .identifier_policy(PolicyKind::Positional)
//!     .build()?;
//!
//! let created = service.create("books", br#"{"name": "book1"}"#)?;
//! assert_eq!(created.id(), Some("1"));
//!
//! let read = service.read_one("books", "1")?;
//! assert_eq!(read, created);
//!
//! service.delete("books", "1")?;
//! service.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`collection`] - Documents, collections and the collection registry
//! - [`common`] - Values, constants, named locks and clock helpers
//! - [`errors`] - Error types and result definitions
//! - [`identifier`] - Token and positional identifier policies
//! - [`manifest`] - Startup collection manifest
//! - [`query`] - Query translation and dereferencing
//! - [`service`] - The CRUD service, its builder and status mapping
//! - [`store`] - Storage backend abstractions and the in-memory store

pub mod collection;
pub mod common;
pub mod errors;
pub mod identifier;
pub mod manifest;
pub mod query;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests {
    #[ctor::ctor]
    fn init() {
        colog::init();
    }
}
