use crate::collection::{BootstrapReport, Collection, CollectionRegistry, Document};
use crate::common::DOC_ID;
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use crate::identifier::IdentifierPolicy;
use crate::query::QueryTranslator;
use crate::store::DocumentStore;
use std::sync::Arc;

/// The CRUD operations over collections of documents.
///
/// Every operation takes the collection name and, where relevant, the raw path
/// identifier and request body exactly as the client sent them, and returns
/// either the resulting document(s) or a typed [DocStoreError]. Only
/// [crate::service::Status::classify] turns an error into a response status.
///
/// Writes create their collection on first reference; reads, updates and
/// deletes require it to exist already.
///
/// `CrudService` is cheap to clone and safe to share between request workers.
#[derive(Clone)]
pub struct CrudService {
    inner: Arc<CrudServiceInner>,
}

impl std::fmt::Debug for CrudService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudService").finish_non_exhaustive()
    }
}

struct CrudServiceInner {
    store: DocumentStore,
    registry: CollectionRegistry,
    translator: QueryTranslator,
    policy: IdentifierPolicy,
    bootstrap: BootstrapReport,
}

impl CrudService {
    pub(crate) fn new(
        store: DocumentStore,
        registry: CollectionRegistry,
        policy: IdentifierPolicy,
        bootstrap: BootstrapReport,
    ) -> Self {
        CrudService {
            inner: Arc::new(CrudServiceInner {
                translator: QueryTranslator::new(store.clone()),
                store,
                registry,
                policy,
                bootstrap,
            }),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.inner.store
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.inner.registry
    }

    pub fn policy(&self) -> &IdentifierPolicy {
        &self.inner.policy
    }

    /// What the startup manifest created and what already existed.
    pub fn bootstrap_report(&self) -> &BootstrapReport {
        &self.inner.bootstrap
    }

    /// Creates a document from a JSON object body.
    pub fn create(&self, collection: &str, body: &[u8]) -> DocStoreResult<Document> {
        let collection = self.inner.registry.ensure(collection)?;
        let document = Document::from_json_slice(body)?;
        self.inner.insert(collection.name(), document)
    }

    /// Creates an already parsed document.
    pub fn create_document(&self, collection: &str, document: Document) -> DocStoreResult<Document> {
        let collection = self.inner.registry.ensure(collection)?;
        self.inner.insert(collection.name(), document)
    }

    /// Reads the document carrying `id`.
    pub fn read_one(&self, collection: &str, id: &str) -> DocStoreResult<Document> {
        let id = self.inner.policy.parse(id)?;
        let collection = self.inner.registry.require(collection)?;

        let mut found = self.inner.translator.by_identifier(&collection, &id)?;
        match found.pop() {
            Some(document) => Ok(document),
            None => Err(document_not_found(collection.name(), &id)),
        }
    }

    /// Reads every document of the collection.
    pub fn read_all(&self, collection: &str) -> DocStoreResult<Vec<Document>> {
        let collection = self.inner.registry.require(collection)?;
        self.inner.translator.all(&collection)
    }

    /// Replaces the document carrying `id` with the body. The body's own `id`
    /// is ignored.
    pub fn update(&self, collection: &str, id: &str, body: &[u8]) -> DocStoreResult<Document> {
        let id = self.inner.policy.parse(id)?;
        let collection = self.inner.registry.require(collection)?;
        let document = Document::from_json_slice(body)?;
        self.inner.replace(&collection, &id, document)
    }

    /// Replaces the document carrying `id` with an already parsed document.
    pub fn update_document(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> DocStoreResult<Document> {
        let id = self.inner.policy.parse(id)?;
        let collection = self.inner.registry.require(collection)?;
        self.inner.replace(&collection, &id, document)
    }

    /// Deletes the document carrying `id` and returns the canonical id.
    ///
    /// An id that resolves to nothing is `NotFound`, every time it is asked.
    pub fn delete(&self, collection: &str, id: &str) -> DocStoreResult<String> {
        let id = self.inner.policy.parse(id)?;
        let collection = self.inner.registry.require(collection)?;
        let name = collection.name();

        let position = match self.inner.translator.locate(&collection, &id)? {
            Some(position) => position,
            None => return Err(document_not_found(name, &id)),
        };

        self.inner.store.delete(name, position).map_err(|e| {
            if e.kind() == &ErrorKind::NotFound {
                return e;
            }
            log::error!("Could not delete {} from {}: {}", id, name, e);
            DocStoreError::new_with_cause(
                &format!("could not delete document with id {}", id),
                ErrorKind::StorageFailure,
                e,
            )
        })?;

        log::debug!("Deleted document {} from {}", id, name);
        Ok(id)
    }

    /// Attribute search extension point. Not implemented.
    pub fn search(&self, collection: &str, _body: &[u8]) -> DocStoreResult<Vec<Document>> {
        CollectionRegistry::validate_name(collection)?;
        log::warn!("Search on {} requested, but search is not implemented", collection);
        Err(DocStoreError::new(
            "search is not implemented",
            ErrorKind::NotImplemented,
        ))
    }

    /// Flushes and closes the underlying store.
    pub fn close(&self) -> DocStoreResult<()> {
        self.inner.store.commit()?;
        self.inner.store.close()
    }
}

impl CrudServiceInner {
    fn insert(&self, collection: &str, mut document: Document) -> DocStoreResult<Document> {
        match self.policy.pre_assign()? {
            Some(id) => {
                document.set_id(&id);
                self.store
                    .insert(collection, &document)
                    .map_err(|e| insert_failed(collection, e))?;
            }
            None => {
                // client supplied ids never reach the index
                document.remove(DOC_ID);
                let position = self
                    .store
                    .insert(collection, &document)
                    .map_err(|e| insert_failed(collection, e))?;

                let id = self.policy.from_position(position);
                document.set_id(&id);
                if let Err(e) = self.store.update(collection, position, &document) {
                    log::error!("Could not write id {} back into {}: {}", id, collection, e);
                    if let Err(cleanup) = self.store.delete(collection, position) {
                        log::error!(
                            "Document at position {} in {} is left without an id: {}",
                            position,
                            collection,
                            cleanup
                        );
                    }
                    return Err(DocStoreError::new_with_cause(
                        &format!("could not add id to document: {}", e),
                        ErrorKind::StorageFailure,
                        e,
                    ));
                }
            }
        }

        log::debug!("Created document {} in {}", document, collection);
        Ok(document)
    }

    fn replace(&self, collection: &Collection, id: &str, mut document: Document) -> DocStoreResult<Document> {
        let name = collection.name();
        document.set_id(id);

        let position = match self.translator.locate(collection, id)? {
            Some(position) => position,
            None => return Err(document_not_found(name, id)),
        };

        self.store.update(name, position, &document).map_err(|e| {
            if e.kind() == &ErrorKind::NotFound {
                return e;
            }
            log::error!("Could not update {} in {}: {}", id, name, e);
            DocStoreError::new_with_cause("could not update document", ErrorKind::StorageFailure, e)
        })?;
        Ok(document)
    }
}

fn insert_failed(collection: &str, cause: DocStoreError) -> DocStoreError {
    log::error!("Could not insert document into {}: {}", collection, cause);
    DocStoreError::new_with_cause(
        &format!("could not insert document: {}", cause),
        ErrorKind::StorageFailure,
        cause,
    )
}

fn document_not_found(collection: &str, id: &str) -> DocStoreError {
    log::debug!("No document with id {} in {}", id, collection);
    DocStoreError::new("document not found", ErrorKind::NotFound)
}
