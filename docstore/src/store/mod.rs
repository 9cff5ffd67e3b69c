//! Storage backends and abstractions.
//!
//! The store layer is the only place documents are persisted. Everything above
//! it (registry, query translator, CRUD service) talks to a [DocumentStore],
//! which wraps any [DocumentStoreProvider] implementation.
//!
//! # Storage Providers
//!
//! - **In-Memory Store**: [memory::InMemoryStore] (via [InMemoryStoreModule]) for
//!   tests and throwaway data
//! - **Fjall Store**: `docstore-fjall-adapter` for persistent, LSM-based storage
//!
//! # Positions
//!
//! Every inserted document gets an internal [Position] assigned by the store.
//! Positions are unique within a collection and never reused. They are not the
//! external identifier; the identifier policy decides how the two relate.
//!
//! # Indexes and Queries
//!
//! A collection can carry indexes on attribute paths. A [Query] is either the
//! wildcard (every position in the collection) or an equality predicate on an
//! indexed attribute. Evaluating an equality predicate on a path with no index
//! is a storage failure.

mod document_store;
pub mod memory;
mod query;
mod store_module;

#[cfg(test)]
pub(crate) mod faulty;

pub use document_store::*;
pub use query::*;
pub use store_module::*;

/// Internal storage position of a document inside its collection.
pub type Position = u64;
