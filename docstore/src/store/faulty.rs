use crate::collection::Document;
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use crate::store::memory::InMemoryStore;
use crate::store::{DocumentStoreProvider, Position, Query};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// An in-memory store whose individual operations can be switched to fail.
#[derive(Clone, Default)]
pub(crate) struct FaultyStore {
    inner: InMemoryStore,
    faults: Arc<Faults>,
}

#[derive(Default)]
pub(crate) struct Faults {
    pub create_index: AtomicBool,
    pub insert: AtomicBool,
    pub read: AtomicBool,
    pub update: AtomicBool,
    pub delete: AtomicBool,
    pub create_collection_calls: AtomicUsize,
}

impl FaultyStore {
    pub(crate) fn new() -> Self {
        FaultyStore::default()
    }

    pub(crate) fn faults(&self) -> Arc<Faults> {
        self.faults.clone()
    }

    fn check(&self, flag: &AtomicBool, operation: &str) -> DocStoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(DocStoreError::new(
                &format!("injected {} failure", operation),
                ErrorKind::StorageFailure,
            ))
        } else {
            Ok(())
        }
    }
}

impl DocumentStoreProvider for FaultyStore {
    fn open_or_create(&self) -> DocStoreResult<()> {
        self.inner.open_or_create()
    }

    fn is_closed(&self) -> DocStoreResult<bool> {
        self.inner.is_closed()
    }

    fn commit(&self) -> DocStoreResult<()> {
        self.inner.commit()
    }

    fn close(&self) -> DocStoreResult<()> {
        self.inner.close()
    }

    fn collection_names(&self) -> DocStoreResult<HashSet<String>> {
        self.inner.collection_names()
    }

    fn has_collection(&self, name: &str) -> DocStoreResult<bool> {
        self.inner.has_collection(name)
    }

    fn create_collection(&self, name: &str) -> DocStoreResult<()> {
        self.faults.create_collection_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_collection(name)
    }

    fn index_names(&self, collection: &str) -> DocStoreResult<HashSet<String>> {
        self.inner.index_names(collection)
    }

    fn create_index(&self, collection: &str, path: &[&str]) -> DocStoreResult<()> {
        self.check(&self.faults.create_index, "create index")?;
        self.inner.create_index(collection, path)
    }

    fn insert(&self, collection: &str, document: &Document) -> DocStoreResult<Position> {
        self.check(&self.faults.insert, "insert")?;
        self.inner.insert(collection, document)
    }

    fn read(&self, collection: &str, position: Position) -> DocStoreResult<Option<Document>> {
        self.check(&self.faults.read, "read")?;
        self.inner.read(collection, position)
    }

    fn update(
        &self,
        collection: &str,
        position: Position,
        document: &Document,
    ) -> DocStoreResult<bool> {
        self.check(&self.faults.update, "update")?;
        self.inner.update(collection, position, document)
    }

    fn delete(&self, collection: &str, position: Position) -> DocStoreResult<bool> {
        self.check(&self.faults.delete, "delete")?;
        self.inner.delete(collection, position)
    }

    fn evaluate_query(&self, collection: &str, query: &Query) -> DocStoreResult<HashSet<Position>> {
        self.inner.evaluate_query(collection, query)
    }

    fn get_attribute(&self, key: &str) -> DocStoreResult<Option<String>> {
        self.inner.get_attribute(key)
    }

    fn set_attribute(&self, key: &str, value: &str) -> DocStoreResult<()> {
        self.inner.set_attribute(key, value)
    }

    fn store_name(&self) -> String {
        "Faulty".to_string()
    }
}
