use crate::common::{LockRegistry, COLLECTION_NAME_PATTERN, DOC_ID};
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use crate::store::DocumentStore;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static NAME_RULE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(COLLECTION_NAME_PATTERN).ok());

/// A collection known to exist in the store with its `id` index in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collection {
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always true: a registry never hands out a collection without its index.
    pub fn identifier_indexed(&self) -> bool {
        true
    }
}

/// Outcome of a manifest bootstrap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Names created by this bootstrap, in manifest order.
    pub created: Vec<String>,
    /// Names that were already present, in manifest order.
    pub existing: Vec<String>,
}

/// Ensure-exists management of collections.
///
/// `ensure` is idempotent and safe to call from any number of workers at
/// once: the check-then-create sequence for a name runs under that name's
/// lock, so concurrent first references create the collection exactly once.
/// Collection and `id` index are created together; a collection is never
/// handed out before its index exists.
#[derive(Clone)]
pub struct CollectionRegistry {
    inner: Arc<CollectionRegistryInner>,
}

impl CollectionRegistry {
    pub fn new(store: DocumentStore) -> Self {
        CollectionRegistry {
            inner: Arc::new(CollectionRegistryInner {
                store,
                locks: LockRegistry::new(),
                known: DashMap::new(),
            }),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.inner.store
    }

    /// Checks a collection name against `^[A-Za-z]+$`.
    pub fn validate_name(name: &str) -> DocStoreResult<()> {
        let rule = NAME_RULE.as_ref().ok_or_else(|| {
            DocStoreError::new("collection name rule does not compile", ErrorKind::InternalError)
        })?;

        if rule.is_match(name) {
            Ok(())
        } else {
            log::warn!("Rejecting collection name '{}'", name);
            Err(DocStoreError::new(
                &format!("collection name '{}' has invalid characters", name),
                ErrorKind::InvalidName,
            ))
        }
    }

    /// Returns the collection, creating it and its `id` index on first
    /// reference.
    pub fn ensure(&self, name: &str) -> DocStoreResult<Collection> {
        self.inner.ensure(name).map(|(collection, _)| collection)
    }

    /// Returns the collection only if it already exists.
    pub fn require(&self, name: &str) -> DocStoreResult<Collection> {
        Self::validate_name(name)?;
        if let Some(collection) = self.inner.known.get(name) {
            return Ok(collection.clone());
        }

        if self.inner.store.has_collection(name)? {
            // repairs a missing index the same way ensure does
            self.ensure(name)
        } else {
            log::debug!("Collection {} does not exist", name);
            Err(DocStoreError::new(
                &format!("could not use collection {}", name),
                ErrorKind::CollectionNotFound,
            ))
        }
    }

    /// Ensures every name in order. The first failure stops the bootstrap.
    pub fn ensure_all<I, S>(&self, names: I) -> DocStoreResult<BootstrapReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BootstrapReport::default();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }

            let (_, created) = self.inner.ensure(name)?;
            if created {
                log::info!("Created collection {}", name);
                report.created.push(name.to_string());
            } else {
                log::info!("Skipping '{}': already exists", name);
                report.existing.push(name.to_string());
            }
        }
        Ok(report)
    }
}

struct CollectionRegistryInner {
    store: DocumentStore,
    locks: LockRegistry,
    known: DashMap<String, Collection>,
}

impl CollectionRegistryInner {
    fn ensure(&self, name: &str) -> DocStoreResult<(Collection, bool)> {
        CollectionRegistry::validate_name(name)?;
        if let Some(collection) = self.known.get(name) {
            return Ok((collection.clone(), false));
        }

        let handle = self.locks.get_lock(name);
        let _guard = handle.lock();

        // another worker may have finished while this one waited
        if let Some(collection) = self.known.get(name) {
            return Ok((collection.clone(), false));
        }

        let created = if self.store.has_collection(name)? {
            if !self.store.has_index(name, &[DOC_ID])? {
                log::warn!("Collection {} exists without an id index, repairing", name);
                self.create_id_index(name)?;
            }
            false
        } else {
            self.store.create_collection(name).map_err(|e| {
                log::error!("Could not create collection {}: {}", name, e);
                DocStoreError::new_with_cause(
                    &format!("could not create collection {}", name),
                    ErrorKind::StorageFailure,
                    e,
                )
            })?;
            self.create_id_index(name)?;
            true
        };

        let collection = Collection {
            name: name.to_string(),
        };
        self.known.insert(name.to_string(), collection.clone());
        Ok((collection, created))
    }

    fn create_id_index(&self, name: &str) -> DocStoreResult<()> {
        self.store.create_index(name, &[DOC_ID]).map_err(|e| {
            log::error!("Could not create id index on {}: {}", name, e);
            DocStoreError::new_with_cause(
                &format!("could not create index on {} in {}", DOC_ID, name),
                ErrorKind::IndexCreationFailed,
                e,
            )
        })
    }
}
