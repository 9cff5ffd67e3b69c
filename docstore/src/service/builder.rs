use crate::collection::{BootstrapReport, CollectionRegistry};
use crate::common::POLICY_ATTRIBUTE;
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use crate::identifier::{IdentifierPolicy, PolicyKind};
use crate::manifest::Manifest;
use crate::service::CrudService;
use crate::store::{DocumentStore, InMemoryStoreModule, StoreModule};
use std::path::Path;

/// Fluent builder for a [CrudService].
///
/// The first failing step is remembered and returned from [build]; later
/// steps are skipped.
///
/// ```text
/// let service = CrudService::builder()
///     .load_module(FjallModule::with_config().db_path("storage").build())
///     .identifier_policy(PolicyKind::Positional)
///     .manifest("collections.conf")
///     .build()?;
/// ```
///
/// [build]: CrudServiceBuilder::build
#[derive(Default)]
pub struct CrudServiceBuilder {
    error: Option<DocStoreError>,
    store: Option<DocumentStore>,
    policy: Option<IdentifierPolicy>,
    manifest: Manifest,
}

impl CrudServiceBuilder {
    pub fn new() -> Self {
        CrudServiceBuilder::default()
    }

    /// Uses the store supplied by `module`. Defaults to an in-memory store.
    pub fn load_module<T: StoreModule>(mut self, module: T) -> Self {
        if self.error.is_none() {
            match module.get_store() {
                Ok(store) => self.store = Some(store),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    pub fn store(mut self, store: DocumentStore) -> Self {
        if self.error.is_none() {
            self.store = Some(store);
        }
        self
    }

    /// Selects the identifier policy. Defaults to [PolicyKind::Token].
    pub fn identifier_policy(mut self, kind: PolicyKind) -> Self {
        if self.error.is_none() {
            match IdentifierPolicy::from_kind(kind) {
                Ok(policy) => self.policy = Some(policy),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    pub fn policy(mut self, policy: IdentifierPolicy) -> Self {
        if self.error.is_none() {
            self.policy = Some(policy);
        }
        self
    }

    /// Reads a collection manifest whose collections are ensured on build.
    pub fn manifest<P: AsRef<Path>>(mut self, path: P) -> Self {
        if self.error.is_none() {
            match Manifest::read(path) {
                Ok(manifest) => self.manifest = manifest,
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Uses an already parsed manifest.
    pub fn collections(mut self, manifest: Manifest) -> Self {
        if self.error.is_none() {
            self.manifest = manifest;
        }
        self
    }

    /// Opens the store, checks the identifier policy stamp and bootstraps the
    /// manifest collections.
    pub fn build(self) -> DocStoreResult<CrudService> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let store = match self.store {
            Some(store) => store,
            None => InMemoryStoreModule::new().get_store()?,
        };
        let policy = match self.policy {
            Some(policy) => policy,
            None => IdentifierPolicy::token()?,
        };

        store.open_or_create()?;
        check_policy_stamp(&store, policy.kind())?;

        let mut existing: Vec<String> = store.collection_names()?.into_iter().collect();
        existing.sort();
        log::info!(
            "Opened {} store with {} identifiers, current collections: {:?}",
            store.store_name(),
            policy,
            existing
        );

        let registry = CollectionRegistry::new(store.clone());
        let report = if self.manifest.is_empty() {
            BootstrapReport::default()
        } else {
            log::info!("Creating collections from manifest");
            let report = registry.ensure_all(self.manifest.names())?;
            log::info!(
                "Done creating collections: {} created, {} already present",
                report.created.len(),
                report.existing.len()
            );
            report
        };

        Ok(CrudService::new(store, registry, policy, report))
    }
}

fn check_policy_stamp(store: &DocumentStore, kind: PolicyKind) -> DocStoreResult<()> {
    match store.get_attribute(POLICY_ATTRIBUTE)? {
        None => {
            log::debug!("Stamping store with {} identifier policy", kind);
            store.set_attribute(POLICY_ATTRIBUTE, &kind.to_string())
        }
        Some(stamp) => {
            let stamped: PolicyKind = stamp.parse().map_err(|e| {
                DocStoreError::new_with_cause(
                    &format!("store carries an unknown identifier policy '{}'", stamp),
                    ErrorKind::ConfigurationError,
                    e,
                )
            })?;

            if stamped == kind {
                Ok(())
            } else {
                log::error!(
                    "Store was created with {} identifiers but {} was requested",
                    stamped,
                    kind
                );
                Err(DocStoreError::new(
                    &format!(
                        "store was created with the {} identifier policy and cannot be opened with {}",
                        stamped, kind
                    ),
                    ErrorKind::ConfigurationError,
                ))
            }
        }
    }
}

impl CrudService {
    pub fn builder() -> CrudServiceBuilder {
        CrudServiceBuilder::new()
    }
}
