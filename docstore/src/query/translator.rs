use crate::collection::{Collection, Document};
use crate::common::{Value, DOC_ID};
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use crate::store::{DocumentStore, Position, Query};

/// Turns identifier and attribute lookups into store queries and dereferences
/// the matched positions into documents.
#[derive(Clone)]
pub struct QueryTranslator {
    store: DocumentStore,
}

impl QueryTranslator {
    pub fn new(store: DocumentStore) -> Self {
        QueryTranslator { store }
    }

    /// Every document in the collection, in position order.
    ///
    /// All or nothing: if any matched position cannot be read the whole call
    /// fails with [ErrorKind::ReadFailed].
    pub fn all(&self, collection: &Collection) -> DocStoreResult<Vec<Document>> {
        let name = collection.name();
        let positions = self
            .store
            .evaluate_query(name, &Query::all())
            .map_err(|e| read_failed(name, e))?;

        let mut positions: Vec<Position> = positions.into_iter().collect();
        positions.sort_unstable();

        positions
            .into_iter()
            .map(|position| self.store.read(name, position).map_err(|e| read_failed(name, e)))
            .collect()
    }

    /// Position of the document carrying `id`, if any.
    ///
    /// With more than one match the lowest position wins.
    pub fn locate(&self, collection: &Collection, id: &str) -> DocStoreResult<Option<Position>> {
        let query = Query::eq(DOC_ID, id).limit(1);
        let positions = self.store.evaluate_query(collection.name(), &query)?;
        Ok(positions.into_iter().min())
    }

    /// The document carrying `id` as a zero or one element list.
    pub fn by_identifier(&self, collection: &Collection, id: &str) -> DocStoreResult<Vec<Document>> {
        self.by_attribute(collection, DOC_ID, Value::from(id), Some(1))
    }

    /// Documents whose `attribute` equals `value`, in position order.
    ///
    /// The attribute must be indexed. A match deleted between evaluation and
    /// read is skipped.
    pub fn by_attribute(
        &self,
        collection: &Collection,
        attribute: &str,
        value: Value,
        limit: Option<usize>,
    ) -> DocStoreResult<Vec<Document>> {
        let name = collection.name();
        let query = Query::Eq {
            attribute: attribute.to_string(),
            value,
            limit,
        };
        log::debug!("Evaluating {} on {}", query, name);

        let mut positions: Vec<Position> =
            self.store.evaluate_query(name, &query)?.into_iter().collect();
        positions.sort_unstable();

        let mut documents = Vec::with_capacity(positions.len());
        for position in positions {
            match self.store.read(name, position) {
                Ok(document) => documents.push(document),
                Err(e) if e.kind() == &ErrorKind::NotFound => continue,
                Err(e) => return Err(read_failed(name, e)),
            }
        }
        Ok(documents)
    }
}

fn read_failed(collection: &str, cause: DocStoreError) -> DocStoreError {
    log::error!("Could not read from collection {}: {}", collection, cause);
    DocStoreError::new_with_cause(
        &format!("could not read from collection {}", collection),
        ErrorKind::ReadFailed,
        cause,
    )
}
