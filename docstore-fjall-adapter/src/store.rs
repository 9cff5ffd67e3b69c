use crate::config::FjallConfig;
use crate::wrapper::{
    decode_position, decode_utf8, index_key, index_key_position, index_prefix, position_key,
    to_docstore_error, FjallValue,
};
use dashmap::DashMap;
use docstore::collection::Document;
use docstore::common::LockRegistry;
use docstore::errors::{DocStoreError, DocStoreResult, ErrorKind};
use docstore::store::{DocumentStoreProvider, Position, Query};
use fjall::{Batch, Keyspace, PartitionHandle, PersistMode};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const META_PARTITION: &str = "docstore_meta";
const COLLECTION_PREFIX: &str = "collection#";
const INDEX_PREFIX: &str = "index#";
const SEQUENCE_PREFIX: &str = "seq#";
const ATTRIBUTE_PREFIX: &str = "attr#";

/// Persistent document store backed by a fjall keyspace.
///
/// # Layout
/// - `docstore_meta` holds the catalog: one key per collection, one per
///   index, the next position of every collection and the store attributes.
/// - `docs#<collection>` maps a big-endian position to the bincode encoded
///   document.
/// - `idx#<collection>` holds one key per indexed value and position; an
///   equality query is a prefix scan.
///
/// Every write touching a collection runs under that collection's lock and
/// lands through a single keyspace batch, so a document and its index entries
/// become visible together.
#[derive(Clone)]
pub struct FjallStore {
    inner: Arc<FjallStoreInner>,
}

impl FjallStore {
    pub fn new(store_config: FjallConfig) -> FjallStore {
        FjallStore {
            inner: Arc::new(FjallStoreInner::new(store_config)),
        }
    }

    pub fn config(&self) -> FjallConfig {
        self.inner.store_config.clone()
    }
}

impl DocumentStoreProvider for FjallStore {
    fn open_or_create(&self) -> DocStoreResult<()> {
        self.inner.open_or_create()
    }

    fn is_closed(&self) -> DocStoreResult<bool> {
        Ok(self.inner.closed.load(Ordering::Relaxed))
    }

    fn commit(&self) -> DocStoreResult<()> {
        self.inner.commit()
    }

    fn close(&self) -> DocStoreResult<()> {
        self.inner.close()
    }

    fn collection_names(&self) -> DocStoreResult<HashSet<String>> {
        let meta = self.inner.meta()?;
        let mut names = HashSet::new();
        for entry in meta.prefix(COLLECTION_PREFIX) {
            let (key, _) = entry.map_err(to_docstore_error)?;
            let key = decode_utf8(&key)?;
            names.insert(key[COLLECTION_PREFIX.len()..].to_string());
        }
        Ok(names)
    }

    fn has_collection(&self, name: &str) -> DocStoreResult<bool> {
        let meta = self.inner.meta()?;
        meta.contains_key(collection_key(name))
            .map_err(to_docstore_error)
    }

    fn create_collection(&self, name: &str) -> DocStoreResult<()> {
        self.inner.create_collection(name)
    }

    fn index_names(&self, collection: &str) -> DocStoreResult<HashSet<String>> {
        self.inner.require_collection(collection)?;
        Ok(self.inner.indexed_paths(collection)?.into_iter().collect())
    }

    fn create_index(&self, collection: &str, path: &[&str]) -> DocStoreResult<()> {
        self.inner.create_index(collection, &path.join("."))
    }

    fn insert(&self, collection: &str, document: &Document) -> DocStoreResult<Position> {
        self.inner.insert(collection, document)
    }

    fn read(&self, collection: &str, position: Position) -> DocStoreResult<Option<Document>> {
        self.inner.require_collection(collection)?;
        let docs = self.inner.partition(&docs_partition(collection))?;
        self.inner.read_document(&docs, position)
    }

    fn update(
        &self,
        collection: &str,
        position: Position,
        document: &Document,
    ) -> DocStoreResult<bool> {
        self.inner.update(collection, position, document)
    }

    fn delete(&self, collection: &str, position: Position) -> DocStoreResult<bool> {
        self.inner.delete(collection, position)
    }

    fn evaluate_query(&self, collection: &str, query: &Query) -> DocStoreResult<HashSet<Position>> {
        self.inner.evaluate(collection, query)
    }

    fn get_attribute(&self, key: &str) -> DocStoreResult<Option<String>> {
        let meta = self.inner.meta()?;
        match meta
            .get(format!("{}{}", ATTRIBUTE_PREFIX, key))
            .map_err(to_docstore_error)?
        {
            Some(value) => Ok(Some(decode_utf8(&value)?)),
            None => Ok(None),
        }
    }

    fn set_attribute(&self, key: &str, value: &str) -> DocStoreResult<()> {
        let meta = self.inner.meta()?;
        meta.insert(format!("{}{}", ATTRIBUTE_PREFIX, key), value)
            .map_err(to_docstore_error)
    }

    fn store_name(&self) -> String {
        "Fjall".to_string()
    }
}

struct FjallStoreInner {
    keyspace: RwLock<Option<Keyspace>>,
    closed: AtomicBool,
    store_config: FjallConfig,
    partitions: DashMap<String, PartitionHandle>,
    sequences: DashMap<String, Position>,
    locks: LockRegistry,
}

impl FjallStoreInner {
    fn new(store_config: FjallConfig) -> FjallStoreInner {
        FjallStoreInner {
            keyspace: RwLock::new(None),
            closed: AtomicBool::new(false),
            store_config,
            partitions: DashMap::new(),
            sequences: DashMap::new(),
            locks: LockRegistry::new(),
        }
    }

    fn open_or_create(&self) -> DocStoreResult<()> {
        let mut guard = self.keyspace.write();
        if guard.is_some() {
            return Ok(());
        }

        let config = self.store_config.keyspace_config();
        match Keyspace::open(config) {
            Ok(keyspace) => {
                log::info!(
                    "Opened fjall keyspace at {} with {} partitions",
                    self.store_config.db_path(),
                    keyspace.partition_count()
                );
                *guard = Some(keyspace);
                self.closed.store(false, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                log::error!("Failed to open or create keyspace: {}", err);
                Err(to_docstore_error(err))
            }
        }
    }

    fn commit(&self) -> DocStoreResult<()> {
        let keyspace = self.keyspace()?;
        keyspace.persist(PersistMode::SyncAll).map_err(|err| {
            log::error!("Failed to commit keyspace: {}", err);
            to_docstore_error(err)
        })
    }

    fn close(&self) -> DocStoreResult<()> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }

        let keyspace = self.keyspace.write().take();
        self.partitions.clear();
        self.sequences.clear();

        if let Some(keyspace) = keyspace {
            if self.store_config.commit_before_close() {
                keyspace.persist(PersistMode::SyncAll).map_err(|err| {
                    log::error!("Failed to persist keyspace on close: {}", err);
                    to_docstore_error(err)
                })?;
            }
            log::info!("Closed fjall keyspace at {}", self.store_config.db_path());
        }
        Ok(())
    }

    fn keyspace(&self) -> DocStoreResult<Keyspace> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("Fjall store is already closed");
            return Err(DocStoreError::new(
                "store is already closed",
                ErrorKind::StoreAlreadyClosed,
            ));
        }
        match self.keyspace.read().as_ref() {
            Some(keyspace) => Ok(keyspace.clone()),
            None => Err(DocStoreError::new(
                "store is not opened",
                ErrorKind::StorageFailure,
            )),
        }
    }

    fn partition(&self, name: &str) -> DocStoreResult<PartitionHandle> {
        let keyspace = self.keyspace()?;
        if let Some(partition) = self.partitions.get(name) {
            return Ok(partition.clone());
        }

        let partition = keyspace
            .open_partition(name, self.store_config.partition_config())
            .map_err(|err| {
                log::error!("Failed to open partition {}: {}", name, err);
                to_docstore_error(err)
            })?;
        self.partitions.insert(name.to_string(), partition.clone());
        Ok(partition)
    }

    #[inline]
    fn meta(&self) -> DocStoreResult<PartitionHandle> {
        self.partition(META_PARTITION)
    }

    fn require_collection(&self, name: &str) -> DocStoreResult<()> {
        let meta = self.meta()?;
        if meta
            .contains_key(collection_key(name))
            .map_err(to_docstore_error)?
        {
            Ok(())
        } else {
            log::error!("Collection {} does not exist", name);
            Err(DocStoreError::new(
                &format!("collection {} does not exist", name),
                ErrorKind::StorageFailure,
            ))
        }
    }

    fn create_collection(&self, name: &str) -> DocStoreResult<()> {
        check_partition_name(name)?;
        let keyspace = self.keyspace()?;
        let meta = self.meta()?;

        let lock = self.locks.get_lock(name);
        let _guard = lock.lock();

        if meta
            .contains_key(collection_key(name))
            .map_err(to_docstore_error)?
        {
            log::error!("Collection {} already exists", name);
            return Err(DocStoreError::new(
                &format!("collection {} already exists", name),
                ErrorKind::StorageFailure,
            ));
        }

        self.partition(&docs_partition(name))?;
        self.partition(&index_partition(name))?;

        let mut batch = keyspace.batch();
        batch.insert(&meta, collection_key(name), name);
        batch.insert(&meta, sequence_key(name), position_key(1).to_vec());
        commit(batch)?;

        self.sequences.insert(name.to_string(), 1);
        log::debug!("Created fjall collection {}", name);
        Ok(())
    }

    fn indexed_paths(&self, collection: &str) -> DocStoreResult<Vec<String>> {
        let meta = self.meta()?;
        let prefix = index_meta_prefix(collection);
        let mut paths = Vec::new();
        for entry in meta.prefix(&prefix) {
            let (key, _) = entry.map_err(to_docstore_error)?;
            let key = decode_utf8(&key)?;
            paths.push(key[prefix.len()..].to_string());
        }
        Ok(paths)
    }

    fn create_index(&self, collection: &str, path: &str) -> DocStoreResult<()> {
        self.require_collection(collection)?;
        let keyspace = self.keyspace()?;
        let meta = self.meta()?;
        let docs = self.partition(&docs_partition(collection))?;
        let index = self.partition(&index_partition(collection))?;

        let lock = self.locks.get_lock(collection);
        let _guard = lock.lock();

        let marker = format!("{}{}", index_meta_prefix(collection), path);
        if meta.contains_key(&marker).map_err(to_docstore_error)? {
            log::error!("Index on {} already exists in {}", path, collection);
            return Err(DocStoreError::new(
                &format!("index on {} already exists in {}", path, collection),
                ErrorKind::StorageFailure,
            ));
        }

        let mut batch = keyspace.batch();
        let mut indexed = 0usize;
        for entry in docs.iter() {
            let (key, value) = entry.map_err(to_docstore_error)?;
            let position = decode_position(&key)?;
            let document = FjallValue::from(value.as_ref()).try_into_document()?;
            if let Some(value) = document.get_path(path) {
                let encoded = FjallValue::try_from_value(value)?;
                batch.insert(&index, index_key(path, &encoded, position), position_key(position).to_vec());
                indexed += 1;
            }
        }
        batch.insert(&meta, marker, path);
        commit(batch)?;

        log::debug!("Indexed {} documents on {} in {}", indexed, path, collection);
        Ok(())
    }

    fn next_position(&self, collection: &str) -> DocStoreResult<Position> {
        if let Some(next) = self.sequences.get(collection) {
            return Ok(*next);
        }
        let meta = self.meta()?;
        let next = match meta
            .get(sequence_key(collection))
            .map_err(to_docstore_error)?
        {
            Some(bytes) => decode_position(&bytes)?,
            None => 1,
        };
        self.sequences.insert(collection.to_string(), next);
        Ok(next)
    }

    fn insert(&self, collection: &str, document: &Document) -> DocStoreResult<Position> {
        self.require_collection(collection)?;
        let keyspace = self.keyspace()?;
        let meta = self.meta()?;
        let docs = self.partition(&docs_partition(collection))?;
        let index = self.partition(&index_partition(collection))?;

        let lock = self.locks.get_lock(collection);
        let _guard = lock.lock();

        let position = self.next_position(collection)?;
        let paths = self.indexed_paths(collection)?;
        let encoded = FjallValue::try_from_document(document)?;

        let mut batch = keyspace.batch();
        batch.insert(&docs, position_key(position).to_vec(), encoded.as_ref());
        add_index_entries(&mut batch, &index, &paths, position, document)?;
        batch.insert(&meta, sequence_key(collection), position_key(position + 1).to_vec());
        commit(batch)?;

        self.sequences.insert(collection.to_string(), position + 1);
        Ok(position)
    }

    fn read_document(
        &self,
        docs: &PartitionHandle,
        position: Position,
    ) -> DocStoreResult<Option<Document>> {
        match docs.get(position_key(position)).map_err(to_docstore_error)? {
            Some(bytes) => Ok(Some(FjallValue::from(bytes.as_ref()).try_into_document()?)),
            None => Ok(None),
        }
    }

    fn update(
        &self,
        collection: &str,
        position: Position,
        document: &Document,
    ) -> DocStoreResult<bool> {
        self.require_collection(collection)?;
        let keyspace = self.keyspace()?;
        let docs = self.partition(&docs_partition(collection))?;
        let index = self.partition(&index_partition(collection))?;

        let lock = self.locks.get_lock(collection);
        let _guard = lock.lock();

        let previous = match self.read_document(&docs, position)? {
            Some(previous) => previous,
            None => return Ok(false),
        };
        let paths = self.indexed_paths(collection)?;
        let encoded = FjallValue::try_from_document(document)?;

        let mut batch = keyspace.batch();
        remove_index_entries(&mut batch, &index, &paths, position, &previous)?;
        add_index_entries(&mut batch, &index, &paths, position, document)?;
        batch.insert(&docs, position_key(position).to_vec(), encoded.as_ref());
        commit(batch)?;
        Ok(true)
    }

    fn delete(&self, collection: &str, position: Position) -> DocStoreResult<bool> {
        self.require_collection(collection)?;
        let keyspace = self.keyspace()?;
        let docs = self.partition(&docs_partition(collection))?;
        let index = self.partition(&index_partition(collection))?;

        let lock = self.locks.get_lock(collection);
        let _guard = lock.lock();

        let previous = match self.read_document(&docs, position)? {
            Some(previous) => previous,
            None => return Ok(false),
        };
        let paths = self.indexed_paths(collection)?;

        let mut batch = keyspace.batch();
        remove_index_entries(&mut batch, &index, &paths, position, &previous)?;
        batch.remove(&docs, position_key(position).to_vec());
        commit(batch)?;
        Ok(true)
    }

    fn evaluate(&self, collection: &str, query: &Query) -> DocStoreResult<HashSet<Position>> {
        self.require_collection(collection)?;
        match query {
            Query::All => {
                let docs = self.partition(&docs_partition(collection))?;
                let mut positions = HashSet::new();
                for entry in docs.keys() {
                    let key = entry.map_err(to_docstore_error)?;
                    positions.insert(decode_position(&key)?);
                }
                Ok(positions)
            }
            Query::Eq {
                attribute,
                value,
                limit,
            } => {
                let meta = self.meta()?;
                let marker = format!("{}{}", index_meta_prefix(collection), attribute);
                if !meta.contains_key(&marker).map_err(to_docstore_error)? {
                    return Err(DocStoreError::new(
                        &format!("please index {} in {} and retry the query", attribute, collection),
                        ErrorKind::StorageFailure,
                    ));
                }

                let index = self.partition(&index_partition(collection))?;
                let encoded = FjallValue::try_from_value(value)?;
                let mut positions = HashSet::new();
                for entry in index
                    .prefix(index_prefix(attribute, &encoded))
                    .take(limit.unwrap_or(usize::MAX))
                {
                    let (key, _) = entry.map_err(to_docstore_error)?;
                    positions.insert(index_key_position(&key)?);
                }
                Ok(positions)
            }
        }
    }
}

fn add_index_entries(
    batch: &mut Batch,
    index: &PartitionHandle,
    paths: &[String],
    position: Position,
    document: &Document,
) -> DocStoreResult<()> {
    for path in paths {
        if let Some(value) = document.get_path(path) {
            let encoded = FjallValue::try_from_value(value)?;
            batch.insert(index, index_key(path, &encoded, position), position_key(position).to_vec());
        }
    }
    Ok(())
}

fn remove_index_entries(
    batch: &mut Batch,
    index: &PartitionHandle,
    paths: &[String],
    position: Position,
    document: &Document,
) -> DocStoreResult<()> {
    for path in paths {
        if let Some(value) = document.get_path(path) {
            let encoded = FjallValue::try_from_value(value)?;
            batch.remove(index, index_key(path, &encoded, position));
        }
    }
    Ok(())
}

fn commit(batch: Batch) -> DocStoreResult<()> {
    batch.commit().map_err(|err| {
        log::error!("Failed to commit batch: {}", err);
        to_docstore_error(err)
    })
}

// partition names allow only [A-Za-z0-9_#$-]
fn check_partition_name(name: &str) -> DocStoreResult<()> {
    let valid = !name.is_empty()
        && name.len() <= 200
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(DocStoreError::new(
            &format!("collection name '{}' cannot be stored", name),
            ErrorKind::StorageFailure,
        ))
    }
}

#[inline]
fn docs_partition(collection: &str) -> String {
    format!("docs#{}", collection)
}

#[inline]
fn index_partition(collection: &str) -> String {
    format!("idx#{}", collection)
}

#[inline]
fn collection_key(name: &str) -> String {
    format!("{}{}", COLLECTION_PREFIX, name)
}

#[inline]
fn sequence_key(name: &str) -> String {
    format!("{}{}", SEQUENCE_PREFIX, name)
}

#[inline]
fn index_meta_prefix(collection: &str) -> String {
    format!("{}{}#", INDEX_PREFIX, collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_context, run_test};
    use docstore::common::Value;
    use docstore::doc;

    #[test]
    fn open_create_and_list_collections() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.create_collection("books").unwrap();
                store.create_collection("authors").unwrap();
                assert_eq!(
                    store.collection_names().unwrap(),
                    HashSet::from(["books".to_string(), "authors".to_string()])
                );
                assert!(store.has_collection("books").unwrap());
                assert!(!store.has_collection("music").unwrap());

                let err = store.create_collection("books").unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::StorageFailure);
            },
            |_| {},
        );
    }

    #[test]
    fn unstorable_collection_name() {
        run_test(
            create_test_context,
            |ctx| {
                let err = ctx.fjall_store().create_collection("a/b").unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::StorageFailure);
            },
            |_| {},
        );
    }

    #[test]
    fn insert_read_update_delete() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.create_collection("books").unwrap();

                let first = store.insert("books", &doc! { "name": "book1" }).unwrap();
                let second = store.insert("books", &doc! { "name": "book2" }).unwrap();
                assert_eq!(first, 1);
                assert_eq!(second, 2);

                let book = store.read("books", first).unwrap().unwrap();
                assert_eq!(book.get("name"), Some(&Value::from("book1")));

                assert!(store.update("books", first, &doc! { "name": "renamed" }).unwrap());
                let book = store.read("books", first).unwrap().unwrap();
                assert_eq!(book.get("name"), Some(&Value::from("renamed")));

                assert!(store.delete("books", first).unwrap());
                assert!(store.read("books", first).unwrap().is_none());
                assert!(!store.delete("books", first).unwrap());
                assert!(!store.update("books", first, &doc! {}).unwrap());
            },
            |_| {},
        );
    }

    #[test]
    fn positions_are_not_reused() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.create_collection("books").unwrap();
                let first = store.insert("books", &doc! { "n": 1 }).unwrap();
                store.delete("books", first).unwrap();
                let second = store.insert("books", &doc! { "n": 2 }).unwrap();
                assert!(second > first);
            },
            |_| {},
        );
    }

    #[test]
    fn unknown_collection_fails() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                let err = store.insert("ghosts", &doc! { "n": 1 }).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::StorageFailure);
                assert!(store.read("ghosts", 1).is_err());
                assert!(store.index_names("ghosts").is_err());
            },
            |_| {},
        );
    }

    #[test]
    fn index_backfills_and_tracks_writes() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.create_collection("books").unwrap();
                let early = store.insert("books", &doc! { "id": "a" }).unwrap();
                store.insert("books", &doc! { "name": "no id" }).unwrap();

                store.create_index("books", &["id"]).unwrap();
                assert_eq!(store.index_names("books").unwrap(), HashSet::from(["id".to_string()]));
                assert_eq!(
                    store.evaluate_query("books", &Query::eq("id", "a")).unwrap(),
                    HashSet::from([early])
                );

                let late = store.insert("books", &doc! { "id": "b" }).unwrap();
                assert_eq!(
                    store.evaluate_query("books", &Query::eq("id", "b")).unwrap(),
                    HashSet::from([late])
                );

                store.update("books", late, &doc! { "id": "c" }).unwrap();
                assert!(store.evaluate_query("books", &Query::eq("id", "b")).unwrap().is_empty());
                assert_eq!(
                    store.evaluate_query("books", &Query::eq("id", "c")).unwrap(),
                    HashSet::from([late])
                );

                store.delete("books", late).unwrap();
                assert!(store.evaluate_query("books", &Query::eq("id", "c")).unwrap().is_empty());

                let err = store.create_index("books", &["id"]).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::StorageFailure);
            },
            |_| {},
        );
    }

    #[test]
    fn nested_path_index() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.create_collection("books").unwrap();
                store.create_index("books", &["meta", "isbn"]).unwrap();
                let position = store
                    .insert("books", &doc! { "meta": doc! { "isbn": "978" } })
                    .unwrap();
                assert_eq!(
                    store.evaluate_query("books", &Query::eq("meta.isbn", "978")).unwrap(),
                    HashSet::from([position])
                );
            },
            |_| {},
        );
    }

    #[test]
    fn query_all_and_limit() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.create_collection("books").unwrap();
                store.create_index("books", &["tag"]).unwrap();
                for _ in 0..5 {
                    store.insert("books", &doc! { "tag": "same" }).unwrap();
                }
                assert_eq!(store.evaluate_query("books", &Query::all()).unwrap().len(), 5);
                assert_eq!(
                    store.evaluate_query("books", &Query::eq("tag", "same")).unwrap().len(),
                    5
                );
                assert_eq!(
                    store
                        .evaluate_query("books", &Query::eq("tag", "same").limit(1))
                        .unwrap(),
                    HashSet::from([1])
                );
            },
            |_| {},
        );
    }

    #[test]
    fn unindexed_equality_fails() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.create_collection("books").unwrap();
                let err = store
                    .evaluate_query("books", &Query::eq("isbn", "1"))
                    .unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::StorageFailure);
                assert!(err.message().contains("please index isbn in books"));
            },
            |_| {},
        );
    }

    #[test]
    fn attributes() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                assert_eq!(store.get_attribute("identifier_policy").unwrap(), None);
                store.set_attribute("identifier_policy", "token").unwrap();
                assert_eq!(
                    store.get_attribute("identifier_policy").unwrap(),
                    Some("token".to_string())
                );
            },
            |_| {},
        );
    }

    #[test]
    fn data_survives_reopen() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.create_collection("books").unwrap();
                store.create_index("books", &["id"]).unwrap();
                let position = store.insert("books", &doc! { "id": "x", "n": 1 }).unwrap();
                store.set_attribute("identifier_policy", "positional").unwrap();
                store.close().unwrap();
                assert!(store.is_closed().unwrap());

                let reopened = FjallStore::new(store.config());
                reopened.open_or_create().unwrap();
                assert!(reopened.has_collection("books").unwrap());
                assert_eq!(
                    reopened.evaluate_query("books", &Query::eq("id", "x")).unwrap(),
                    HashSet::from([position])
                );
                assert_eq!(
                    reopened.get_attribute("identifier_policy").unwrap(),
                    Some("positional".to_string())
                );

                let next = reopened.insert("books", &doc! { "id": "y" }).unwrap();
                assert_eq!(next, position + 1);
                reopened.close().unwrap();
            },
            |_| {},
        );
    }

    #[test]
    fn closed_store_rejects_operations() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.close().unwrap();
                store.close().unwrap();
                let err = store.collection_names().unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::StoreAlreadyClosed);
            },
            |_| {},
        );
    }

    #[test]
    fn concurrent_inserts_get_distinct_positions() {
        run_test(
            create_test_context,
            |ctx| {
                let store = ctx.fjall_store();
                store.create_collection("books").unwrap();
                store.create_index("books", &["id"]).unwrap();

                let handles: Vec<_> = (0..8)
                    .map(|t| {
                        let store = store.clone();
                        std::thread::spawn(move || {
                            (0..25)
                                .map(|i| {
                                    store
                                        .insert("books", &doc! { "id": format!("{}-{}", t, i) })
                                        .unwrap()
                                })
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();

                let mut positions = HashSet::new();
                for handle in handles {
                    for position in handle.join().unwrap() {
                        assert!(positions.insert(position));
                    }
                }
                assert_eq!(positions.len(), 200);
                assert_eq!(store.evaluate_query("books", &Query::all()).unwrap().len(), 200);
            },
            |_| {},
        );
    }
}
