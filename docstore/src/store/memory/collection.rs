use crate::collection::Document;
use crate::common::Value;
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use crate::store::{Position, Query};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

type IndexEntries = BTreeMap<Vec<u8>, BTreeSet<Position>>;

/// The documents and indexes of one in-memory collection.
///
/// Positions start at 1 and only grow. Each index maps the encoded value at
/// its attribute path to the positions holding that value; documents without
/// a value at the path are left out of the index.
pub(crate) struct InMemoryCollection {
    name: String,
    next_position: Position,
    documents: BTreeMap<Position, Document>,
    indexes: HashMap<String, IndexEntries>,
}

impl InMemoryCollection {
    pub(crate) fn new(name: &str) -> Self {
        InMemoryCollection {
            name: name.to_string(),
            next_position: 1,
            documents: BTreeMap::new(),
            indexes: HashMap::new(),
        }
    }

    pub(crate) fn index_names(&self) -> HashSet<String> {
        self.indexes.keys().cloned().collect()
    }

    pub(crate) fn create_index(&mut self, path: &str) -> DocStoreResult<()> {
        if self.indexes.contains_key(path) {
            log::error!("Index on {} already exists in {}", path, self.name);
            return Err(DocStoreError::new(
                &format!("index on {} already exists in {}", path, self.name),
                ErrorKind::StorageFailure,
            ));
        }

        let mut entries = IndexEntries::new();
        for (position, document) in &self.documents {
            if let Some(value) = document.get_path(path) {
                entries
                    .entry(index_key(value)?)
                    .or_default()
                    .insert(*position);
            }
        }
        self.indexes.insert(path.to_string(), entries);
        Ok(())
    }

    pub(crate) fn insert(&mut self, document: &Document) -> DocStoreResult<Position> {
        let position = self.next_position;
        self.add_to_indexes(position, document)?;
        self.documents.insert(position, document.clone());
        self.next_position += 1;
        Ok(position)
    }

    pub(crate) fn read(&self, position: Position) -> Option<Document> {
        self.documents.get(&position).cloned()
    }

    pub(crate) fn update(&mut self, position: Position, document: &Document) -> DocStoreResult<bool> {
        let previous = match self.documents.get(&position) {
            Some(previous) => previous.clone(),
            None => return Ok(false),
        };
        self.remove_from_indexes(position, &previous)?;
        self.add_to_indexes(position, document)?;
        self.documents.insert(position, document.clone());
        Ok(true)
    }

    pub(crate) fn delete(&mut self, position: Position) -> DocStoreResult<bool> {
        let previous = match self.documents.remove(&position) {
            Some(previous) => previous,
            None => return Ok(false),
        };
        self.remove_from_indexes(position, &previous)?;
        Ok(true)
    }

    pub(crate) fn evaluate(&self, query: &Query) -> DocStoreResult<HashSet<Position>> {
        match query {
            Query::All => Ok(self.documents.keys().copied().collect()),
            Query::Eq {
                attribute,
                value,
                limit,
            } => {
                let entries = self.indexes.get(attribute).ok_or_else(|| {
                    log::error!("Query on unindexed attribute {} in {}", attribute, self.name);
                    DocStoreError::new(
                        &format!("please index {} in {} and retry the query", attribute, self.name),
                        ErrorKind::StorageFailure,
                    )
                })?;

                let positions = match entries.get(&index_key(value)?) {
                    Some(positions) => positions,
                    None => return Ok(HashSet::new()),
                };
                let cap = limit.unwrap_or(usize::MAX);
                Ok(positions.iter().take(cap).copied().collect())
            }
        }
    }

    fn add_to_indexes(&mut self, position: Position, document: &Document) -> DocStoreResult<()> {
        for (path, entries) in self.indexes.iter_mut() {
            if let Some(value) = document.get_path(path) {
                entries.entry(index_key(value)?).or_default().insert(position);
            }
        }
        Ok(())
    }

    fn remove_from_indexes(&mut self, position: Position, document: &Document) -> DocStoreResult<()> {
        for (path, entries) in self.indexes.iter_mut() {
            if let Some(value) = document.get_path(path) {
                let key = index_key(value)?;
                let now_empty = match entries.get_mut(&key) {
                    Some(positions) => {
                        positions.remove(&position);
                        positions.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

fn index_key(value: &Value) -> DocStoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        log::error!("Could not encode index key {}: {}", value, e);
        DocStoreError::new(
            &format!("could not encode index key: {}", e),
            ErrorKind::EncodingError,
        )
    })
}
