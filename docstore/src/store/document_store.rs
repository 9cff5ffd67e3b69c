use crate::collection::Document;
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use crate::store::{Position, Query};
use std::collections::HashSet;
use std::sync::Arc;

/// Low-level interface every document store backend implements.
///
/// # Purpose
/// Defines the storage contract the registry, query translator and CRUD
/// service rely on: named collections of documents addressed by [Position],
/// attribute indexes, and query evaluation against those indexes.
///
/// # Contract
/// - `insert` assigns a fresh position, unique within the collection.
/// - `read`, `update` and `delete` report a missing position as `Ok(None)` /
///   `Ok(false)` rather than an error; [DocumentStore] turns that into
///   [ErrorKind::NotFound].
/// - `update` is a full replace; indexes are maintained for the new content.
/// - `create_index` indexes the documents already in the collection.
/// - `evaluate_query` returns a deduplicated set of positions. Equality on an
///   unindexed attribute is an error.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; the one store handle is shared by every
/// request worker.
pub trait DocumentStoreProvider: Send + Sync {
    /// Opens or creates the store. Must be called before any other operation.
    fn open_or_create(&self) -> DocStoreResult<()>;

    fn is_closed(&self) -> DocStoreResult<bool>;

    /// Flushes pending writes to durable storage. A no-op for memory stores.
    fn commit(&self) -> DocStoreResult<()>;

    /// Closes the store. Closing twice is not an error.
    fn close(&self) -> DocStoreResult<()>;

    /// Names of every collection in the store.
    fn collection_names(&self) -> DocStoreResult<HashSet<String>>;

    fn has_collection(&self, name: &str) -> DocStoreResult<bool>;

    /// Creates an empty collection. Fails if it already exists.
    fn create_collection(&self, name: &str) -> DocStoreResult<()>;

    /// Names of the indexes on a collection, each the attribute path joined
    /// with `.`.
    fn index_names(&self, collection: &str) -> DocStoreResult<HashSet<String>>;

    /// Creates an index on the attribute path. Fails if it already exists.
    fn create_index(&self, collection: &str, path: &[&str]) -> DocStoreResult<()>;

    fn insert(&self, collection: &str, document: &Document) -> DocStoreResult<Position>;

    fn read(&self, collection: &str, position: Position) -> DocStoreResult<Option<Document>>;

    /// Replaces the document at `position`. `Ok(false)` if there is none.
    fn update(&self, collection: &str, position: Position, document: &Document)
        -> DocStoreResult<bool>;

    /// Removes the document at `position`. `Ok(false)` if there is none.
    fn delete(&self, collection: &str, position: Position) -> DocStoreResult<bool>;

    fn evaluate_query(&self, collection: &str, query: &Query) -> DocStoreResult<HashSet<Position>>;

    /// Reads a store-level attribute.
    fn get_attribute(&self, key: &str) -> DocStoreResult<Option<String>>;

    /// Writes a store-level attribute.
    fn set_attribute(&self, key: &str, value: &str) -> DocStoreResult<()>;

    /// Human readable name of the backend, used in logs.
    fn store_name(&self) -> String;
}

/// High-level, cheaply cloneable handle to a document store.
///
/// Wraps a [DocumentStoreProvider] in an `Arc` and normalizes its results:
/// a missing position becomes [ErrorKind::NotFound], and the collection name is
/// attached to messages.
///
/// ```text
/// let store = DocumentStore::new(InMemoryStore::new());
/// store.open_or_create()?;
/// store.create_collection("books")?;
/// store.create_index("books", &["id"])?;
/// let position = store.insert("books", &doc!{ "name": "book1" })?;
/// let book = store.read("books", position)?;
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<dyn DocumentStoreProvider>,
}

impl DocumentStore {
    pub fn new<T: DocumentStoreProvider + 'static>(inner: T) -> Self {
        DocumentStore {
            inner: Arc::new(inner),
        }
    }

    pub fn open_or_create(&self) -> DocStoreResult<()> {
        self.inner.open_or_create()
    }

    pub fn is_closed(&self) -> DocStoreResult<bool> {
        self.inner.is_closed()
    }

    pub fn commit(&self) -> DocStoreResult<()> {
        self.inner.commit()
    }

    pub fn close(&self) -> DocStoreResult<()> {
        self.inner.close()
    }

    pub fn collection_names(&self) -> DocStoreResult<HashSet<String>> {
        self.inner.collection_names()
    }

    pub fn has_collection(&self, name: &str) -> DocStoreResult<bool> {
        self.inner.has_collection(name)
    }

    pub fn create_collection(&self, name: &str) -> DocStoreResult<()> {
        self.inner.create_collection(name)
    }

    pub fn index_names(&self, collection: &str) -> DocStoreResult<HashSet<String>> {
        self.inner.index_names(collection)
    }

    pub fn has_index(&self, collection: &str, path: &[&str]) -> DocStoreResult<bool> {
        Ok(self.inner.index_names(collection)?.contains(&path.join(".")))
    }

    pub fn create_index(&self, collection: &str, path: &[&str]) -> DocStoreResult<()> {
        self.inner.create_index(collection, path)
    }

    pub fn insert(&self, collection: &str, document: &Document) -> DocStoreResult<Position> {
        self.inner.insert(collection, document)
    }

    /// Reads the document at `position`, failing with `NotFound` if absent.
    pub fn read(&self, collection: &str, position: Position) -> DocStoreResult<Document> {
        match self.inner.read(collection, position)? {
            Some(document) => Ok(document),
            None => Err(not_found(collection, position)),
        }
    }

    /// Replaces the document at `position`, failing with `NotFound` if absent.
    pub fn update(
        &self,
        collection: &str,
        position: Position,
        document: &Document,
    ) -> DocStoreResult<()> {
        if self.inner.update(collection, position, document)? {
            Ok(())
        } else {
            Err(not_found(collection, position))
        }
    }

    /// Deletes the document at `position`, failing with `NotFound` if absent.
    pub fn delete(&self, collection: &str, position: Position) -> DocStoreResult<()> {
        if self.inner.delete(collection, position)? {
            Ok(())
        } else {
            Err(not_found(collection, position))
        }
    }

    pub fn evaluate_query(
        &self,
        collection: &str,
        query: &Query,
    ) -> DocStoreResult<HashSet<Position>> {
        self.inner.evaluate_query(collection, query)
    }

    pub fn get_attribute(&self, key: &str) -> DocStoreResult<Option<String>> {
        self.inner.get_attribute(key)
    }

    pub fn set_attribute(&self, key: &str, value: &str) -> DocStoreResult<()> {
        self.inner.set_attribute(key, value)
    }

    pub fn store_name(&self) -> String {
        self.inner.store_name()
    }
}

fn not_found(collection: &str, position: Position) -> DocStoreError {
    log::debug!("No document at position {} in {}", position, collection);
    DocStoreError::new("document not found", ErrorKind::NotFound)
}
