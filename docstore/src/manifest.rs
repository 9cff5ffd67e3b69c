use crate::collection::CollectionRegistry;
use crate::errors::{DocStoreError, DocStoreResult, ErrorKind};
use std::path::Path;

/// The startup collection manifest.
///
/// Plain text, one collection name per line. Surrounding whitespace is
/// trimmed and blank lines are skipped. Any other line must be a valid
/// collection name; a single malformed line rejects the whole manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    names: Vec<String>,
}

impl Manifest {
    pub fn read<P: AsRef<Path>>(path: P) -> DocStoreResult<Manifest> {
        let path = path.as_ref();
        log::info!("Reading collections from {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|e| {
            log::error!("Could not read manifest {}: {}", path.display(), e);
            DocStoreError::new_with_cause(
                &format!("could not read collection manifest {}", path.display()),
                ErrorKind::ManifestError,
                e.into(),
            )
        })?;
        Manifest::parse(&text)
    }

    pub fn parse(text: &str) -> DocStoreResult<Manifest> {
        let mut names = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let name = line.trim();
            if name.is_empty() {
                continue;
            }

            CollectionRegistry::validate_name(name).map_err(|e| {
                DocStoreError::new_with_cause(
                    &format!("line {} of the collection manifest is malformed", index + 1),
                    ErrorKind::ManifestError,
                    e,
                )
            })?;
            names.push(name.to_string());
        }
        Ok(Manifest { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
