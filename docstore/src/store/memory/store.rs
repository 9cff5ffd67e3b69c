use super::InMemoryCollection;
use crate::collection::Document;
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use crate::store::{DocumentStoreProvider, Position, Query};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory implementation of a document store.
///
/// # Purpose
/// `InMemoryStore` keeps every collection in process memory. It backs unit
/// tests and the server's `--in-memory` mode.
///
/// # Characteristics
/// - **Thread-Safe**: collections live in a `DashMap`; each collection is
///   guarded by its own `RwLock`, so readers of one collection never block
///   writers of another
/// - **No Persistence**: all data is lost when the store is dropped
///
/// # Usage
/// ```text
/// let store = DocumentStore::new(InMemoryStore::new());
/// store.open_or_create().unwrap();
/// store.create_collection("books").unwrap();
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner::new()),
        }
    }
}

impl DocumentStoreProvider for InMemoryStore {
    fn open_or_create(&self) -> DocStoreResult<()> {
        self.inner.check_opened()?;
        log::debug!("In-memory store opened");
        Ok(())
    }

    fn is_closed(&self) -> DocStoreResult<bool> {
        Ok(self.inner.closed.load(Ordering::Relaxed))
    }

    fn commit(&self) -> DocStoreResult<()> {
        self.inner.check_opened()
    }

    fn close(&self) -> DocStoreResult<()> {
        self.inner.close()
    }

    fn collection_names(&self) -> DocStoreResult<HashSet<String>> {
        self.inner.check_opened()?;
        Ok(self
            .inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }

    fn has_collection(&self, name: &str) -> DocStoreResult<bool> {
        self.inner.check_opened()?;
        Ok(self.inner.collections.contains_key(name))
    }

    fn create_collection(&self, name: &str) -> DocStoreResult<()> {
        self.inner.create_collection(name)
    }

    fn index_names(&self, collection: &str) -> DocStoreResult<HashSet<String>> {
        let collection = self.inner.collection(collection)?;
        let guard = collection.read();
        Ok(guard.index_names())
    }

    fn create_index(&self, collection: &str, path: &[&str]) -> DocStoreResult<()> {
        let collection = self.inner.collection(collection)?;
        let mut guard = collection.write();
        guard.create_index(&path.join("."))
    }

    fn insert(&self, collection: &str, document: &Document) -> DocStoreResult<Position> {
        let collection = self.inner.collection(collection)?;
        let mut guard = collection.write();
        guard.insert(document)
    }

    fn read(&self, collection: &str, position: Position) -> DocStoreResult<Option<Document>> {
        let collection = self.inner.collection(collection)?;
        let guard = collection.read();
        Ok(guard.read(position))
    }

    fn update(
        &self,
        collection: &str,
        position: Position,
        document: &Document,
    ) -> DocStoreResult<bool> {
        let collection = self.inner.collection(collection)?;
        let mut guard = collection.write();
        guard.update(position, document)
    }

    fn delete(&self, collection: &str, position: Position) -> DocStoreResult<bool> {
        let collection = self.inner.collection(collection)?;
        let mut guard = collection.write();
        guard.delete(position)
    }

    fn evaluate_query(&self, collection: &str, query: &Query) -> DocStoreResult<HashSet<Position>> {
        let collection = self.inner.collection(collection)?;
        let guard = collection.read();
        guard.evaluate(query)
    }

    fn get_attribute(&self, key: &str) -> DocStoreResult<Option<String>> {
        self.inner.check_opened()?;
        Ok(self.inner.attributes.get(key).map(|v| v.value().clone()))
    }

    fn set_attribute(&self, key: &str, value: &str) -> DocStoreResult<()> {
        self.inner.check_opened()?;
        self.inner.attributes.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn store_name(&self) -> String {
        "InMemory".to_string()
    }
}

#[derive(Default)]
struct InMemoryStoreInner {
    closed: AtomicBool,
    collections: DashMap<String, Arc<RwLock<InMemoryCollection>>>,
    attributes: DashMap<String, String>,
}

impl InMemoryStoreInner {
    fn new() -> InMemoryStoreInner {
        InMemoryStoreInner {
            closed: AtomicBool::new(false),
            collections: DashMap::new(),
            attributes: DashMap::new(),
        }
    }

    fn check_opened(&self) -> DocStoreResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("In-memory store is already closed");
            return Err(DocStoreError::new(
                "store is already closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        Ok(())
    }

    fn close(&self) -> DocStoreResult<()> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }
        self.collections.clear();
        log::debug!("In-memory store closed");
        Ok(())
    }

    fn create_collection(&self, name: &str) -> DocStoreResult<()> {
        self.check_opened()?;
        match self.collections.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                log::error!("Collection {} already exists", name);
                Err(DocStoreError::new(
                    &format!("collection {} already exists", name),
                    ErrorKind::StorageFailure,
                ))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::new(RwLock::new(InMemoryCollection::new(name))));
                Ok(())
            }
        }
    }

    // clones the handle out so the dashmap shard is not held across the
    // collection lock
    fn collection(&self, name: &str) -> DocStoreResult<Arc<RwLock<InMemoryCollection>>> {
        self.check_opened()?;
        match self.collections.get(name) {
            Some(entry) => Ok(entry.value().clone()),
            None => {
                log::error!("Collection {} does not exist", name);
                Err(DocStoreError::new(
                    &format!("collection {} does not exist", name),
                    ErrorKind::StorageFailure,
                ))
            }
        }
    }
}
