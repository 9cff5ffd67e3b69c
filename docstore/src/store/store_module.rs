use crate::errors::DocStoreResult;
use crate::store::memory::InMemoryStore;
use crate::store::DocumentStore;

/// Supplies the store a service runs on.
pub trait StoreModule {
    fn get_store(&self) -> DocStoreResult<DocumentStore>;
}

/// Module for the non-persistent [InMemoryStore].
#[derive(Clone, Copy, Debug, Default)]
pub struct InMemoryStoreModule;

impl InMemoryStoreModule {
    pub fn new() -> InMemoryStoreModule {
        InMemoryStoreModule
    }
}

impl StoreModule for InMemoryStoreModule {
    fn get_store(&self) -> DocStoreResult<DocumentStore> {
        Ok(DocumentStore::new(InMemoryStore::new()))
    }
}
